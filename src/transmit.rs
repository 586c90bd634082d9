//! Sample rate pulse scheduling.
//!
//! # Design
//! The [TransmitScheduler] runs in the highest priority interrupt, one
//! invocation per audio sample. It never blocks: every tick takes at most
//! one line word out of the transmit double buffer and offers one symbol to
//! the pulse generator. If the buffer has nothing ready, the line code's
//! idle symbol keeps the receiver's pulse clock running.
use handoff::Reader;
use ppm_codec::LineCode;

use crate::{
    design_parameters::MIN_ALARM_LEAD_US, format::SampleRate,
    telemetry::Statistics,
};

/// Consumer of pulse symbols, e.g. the PIO pulse generator.
pub trait PulseSink {
    /// Queue a symbol without blocking.
    ///
    /// # Returns
    /// False if there was no room and the symbol was dropped.
    fn try_emit(&mut self, symbol: u32) -> bool;

    /// Queue a symbol, waiting for room. Not for interrupt context.
    fn emit(&mut self, symbol: u32) {
        while !self.try_emit(symbol) {
            core::hint::spin_loop();
        }
    }

    /// Follow a sample rate change. Only needed by sinks that clock out
    /// symbols themselves.
    fn set_rate(&mut self, _rate: SampleRate) {}
}

/// Next absolute tick deadline on the free running microsecond counter.
///
/// A deadline less than [MIN_ALARM_LEAD_US] ahead of `now_us` counts as
/// missed and is moved to `now_us + max(delay_us, MIN_ALARM_LEAD_US)`. The
/// time lost is not made up.
///
/// # Returns
/// The deadline to arm and whether it kept the schedule.
pub fn next_deadline(previous: u32, delay_us: u32, now_us: u32) -> (u32, bool) {
    let deadline = previous.wrapping_add(delay_us);
    if (deadline.wrapping_sub(now_us) as i32) >= MIN_ALARM_LEAD_US as i32 {
        (deadline, true)
    } else {
        (now_us.wrapping_add(delay_us.max(MIN_ALARM_LEAD_US)), false)
    }
}

/// Sample tick period generator.
///
/// The tick timer counts whole microseconds. The fractional part of the
/// period is carried in an accumulator so that the average period is exactly
/// `1e6 / rate`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TickInterval {
    rate: SampleRate,
    whole: u32,
    remainder: u32,
    accumulator: u32,
}

impl TickInterval {
    pub const fn new(rate: SampleRate) -> Self {
        Self {
            rate,
            whole: 1_000_000 / rate.hz(),
            remainder: 1_000_000 % rate.hz(),
            accumulator: 0,
        }
    }

    pub fn rate(&self) -> SampleRate {
        self.rate
    }

    /// Nominal period in microseconds.
    pub fn period_us(&self) -> f32 {
        1e6 / self.rate.hz() as f32
    }

    /// Microseconds until the next tick.
    pub fn next_us(&mut self) -> u32 {
        self.accumulator += self.remainder;
        if self.accumulator >= self.rate.hz() {
            self.accumulator -= self.rate.hz();
            self.whole + 1
        } else {
            self.whole
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxState {
    /// Nothing ready to send. Idle symbols are emitted.
    Idle,
    /// Draining a published buffer.
    Draining,
}

/// Drains the transmit buffer into the pulse generator at the sample rate.
pub struct TransmitScheduler<'a, L, S, const N: usize> {
    line: L,
    sink: S,
    reader: Reader<'a, u32, N>,
    interval: TickInterval,
    phase: u32,
    state: TxState,
}

impl<'a, L: LineCode, S: PulseSink, const N: usize> TransmitScheduler<'a, L, S, N> {
    pub fn new(
        line: L,
        sink: S,
        reader: Reader<'a, u32, N>,
        rate: SampleRate,
    ) -> Self {
        Self {
            line,
            sink,
            reader,
            interval: TickInterval::new(rate),
            phase: 0,
            state: TxState::Idle,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn interval(&self) -> &TickInterval {
        &self.interval
    }

    pub fn sink(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Run one sample tick.
    ///
    /// # Args
    /// * `rate` - The active sample rate. A change restarts the tick
    ///   interval and the symbol phase.
    /// * `stats` - Statistics to update.
    ///
    /// # Returns
    /// Microseconds until the next tick is due.
    pub fn tick(&mut self, rate: SampleRate, stats: &Statistics) -> u32 {
        if rate != self.interval.rate() {
            self.interval = TickInterval::new(rate);
            self.sink.set_rate(rate);
            self.phase = 0;
        }

        if self.phase == 0 {
            let symbol = match self.reader.pop() {
                Some(word) => {
                    self.state = TxState::Draining;
                    Statistics::count(&stats.ppm_sent);
                    stats.summed_ppm_out.fetch_add(
                        self.line.level(word) as u64,
                        portable_atomic::Ordering::Relaxed,
                    );
                    self.line.symbol(word)
                }
                None => {
                    self.state = TxState::Idle;
                    Statistics::count(&stats.silence_ticks);
                    self.line.idle()
                }
            };
            if !self.sink.try_emit(symbol) {
                Statistics::count(&stats.generator_overflows);
            }
        }
        self.phase = (self.phase + 1) % L::TICKS_PER_SYMBOL;

        self.interval.next_us()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff::DoubleBuffer;
    use ppm_codec::{Calibration, PdmLine};

    #[derive(Default)]
    struct Capture(Vec<u32>, usize);

    impl PulseSink for Capture {
        fn try_emit(&mut self, symbol: u32) -> bool {
            if self.0.len() < self.1 {
                self.0.push(symbol);
                true
            } else {
                false
            }
        }
    }

    const CAL: Calibration = Calibration::new(10, 375, 1024);

    #[test]
    fn interval_average() {
        for rate in [SampleRate::Hz44100, SampleRate::Hz48000] {
            let mut i = TickInterval::new(rate);
            let total: u32 = (0..rate.hz()).map(|_| i.next_us()).sum();
            assert_eq!(total, 1_000_000);
        }
        let mut i = TickInterval::new(SampleRate::Hz48000);
        let first: Vec<u32> = (0..6).map(|_| i.next_us()).collect();
        assert_eq!(first, [20, 21, 21, 21, 21, 21]);
    }

    #[test]
    fn deadlines() {
        assert_eq!(next_deadline(1_000, 20, 1_005), (1_020, true));
        assert_eq!(next_deadline(1_000, 20, 1_010), (1_020, true));
        // Too close to arm: the counter could pass before the write lands.
        assert_eq!(next_deadline(1_000, 20, 1_019), (1_039, false));
        assert_eq!(next_deadline(1_000, 20, 1_030), (1_050, false));
        assert_eq!(next_deadline(1_000, 5, 1_000), (1_010, false));
        // Counter wrap
        assert_eq!(next_deadline(u32::MAX - 5, 20, u32::MAX), (14, true));
        assert_eq!(next_deadline(u32::MAX - 5, 20, 10), (30, false));
    }

    #[test]
    fn blocking_emit_waits() {
        struct Slow(u32, Vec<u32>);

        impl PulseSink for Slow {
            fn try_emit(&mut self, symbol: u32) -> bool {
                if self.0 > 0 {
                    self.0 -= 1;
                    false
                } else {
                    self.1.push(symbol);
                    true
                }
            }
        }

        let mut sink = Slow(3, vec![]);
        sink.emit(400);
        sink.emit(401);
        assert_eq!(sink.0, 0);
        assert_eq!(sink.1, [400, 401]);
    }

    #[test]
    fn drain_then_silence() {
        let stats = Statistics::new();
        let mut buf = DoubleBuffer::<u32, 4>::new(0);
        let (mut w, r) = buf.split();
        let mut tx = TransmitScheduler::new(
            CAL,
            Capture(vec![], 10),
            r,
            SampleRate::Hz48000,
        );
        w.extend(&[0, 511, 1023]).unwrap();
        w.publish().unwrap();
        for _ in 0..4 {
            tx.tick(SampleRate::Hz48000, &stats);
        }
        assert_eq!(tx.state(), TxState::Idle);
        assert_eq!(tx.sink().0, [375, 375 + 511, 375 + 1023, 375]);
        let t = stats.take();
        assert_eq!(t.ppm_sent, 3);
        assert_eq!(t.silence_ticks, 1);
        assert_eq!(t.summed_ppm_out, 511 + 1023);
        w.push(5).unwrap();
        w.publish().unwrap();
        // The drained slot went back to the writer.
        assert!(w.can_write());
    }

    #[test]
    fn overflow_is_counted() {
        let stats = Statistics::new();
        let mut buf = DoubleBuffer::<u32, 4>::new(0);
        let (_w, r) = buf.split();
        let mut tx =
            TransmitScheduler::new(CAL, Capture(vec![], 2), r, SampleRate::Hz48000);
        for _ in 0..5 {
            tx.tick(SampleRate::Hz48000, &stats);
        }
        assert_eq!(stats.take().generator_overflows, 3);
    }

    #[test]
    fn pdm_symbol_phase() {
        let stats = Statistics::new();
        let mut buf = DoubleBuffer::<u32, 4>::new(0);
        let (mut w, r) = buf.split();
        let mut tx = TransmitScheduler::new(
            PdmLine,
            Capture(vec![], 10),
            r,
            SampleRate::Hz48000,
        );
        w.push(0x0000_ffff).unwrap();
        w.publish().unwrap();
        for _ in 0..64 {
            tx.tick(SampleRate::Hz48000, &stats);
        }
        // One word per 32 sample ticks.
        assert_eq!(tx.sink().0, [0x0000_ffff, PdmLine::IDLE]);
        assert_eq!(stats.take().summed_ppm_out, 16);
    }

    #[test]
    fn rate_change() {
        let stats = Statistics::new();
        let mut buf = DoubleBuffer::<u32, 4>::new(0);
        let (_w, r) = buf.split();
        let mut tx =
            TransmitScheduler::new(CAL, Capture(vec![], 10), r, SampleRate::Hz48000);
        tx.tick(SampleRate::Hz48000, &stats);
        assert_eq!(tx.tick(SampleRate::Hz44100, &stats), 22);
        assert_eq!(tx.interval().rate(), SampleRate::Hz44100);
        assert!((tx.interval().period_us() - 22.675737).abs() < 1e-4);
    }
}
