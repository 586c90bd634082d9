use handoff::Sender;
use portable_atomic::Ordering;
use ppm_codec::Calibration;

use crate::telemetry::Statistics;

/// Producer of measured pulse widths, e.g. the PIO pulse detector.
pub trait PulseSource {
    /// Take the next measured low time in ticks, if any.
    fn poll_width(&mut self) -> Option<u32>;
}

/// Turns measured pulse widths into codes for the other core.
pub struct ReceiveLoop<P, C> {
    source: P,
    channel: C,
    calibration: Calibration,
}

impl<P: PulseSource, C: Sender> ReceiveLoop<P, C> {
    pub fn new(source: P, channel: C, calibration: Calibration) -> Self {
        Self {
            source,
            channel,
            calibration,
        }
    }

    pub fn channel(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Drain the detector.
    ///
    /// Widths outside the code range are noise. Codes the channel cannot
    /// take are dropped. Both are counted.
    ///
    /// # Args
    /// * `now_us` - Current time, drives partial batch flushing.
    /// * `stats` - Statistics to update.
    ///
    /// # Returns
    /// The number of widths processed.
    pub fn poll(&mut self, now_us: u32, stats: &Statistics) -> usize {
        let mut count = 0;
        while let Some(width) = self.source.poll_width() {
            count += 1;
            let Some(code) = self.calibration.accept(width) else {
                Statistics::count(&stats.noise_dropped);
                continue;
            };
            Statistics::count(&stats.ppm_received);
            stats
                .summed_ppm_in
                .fetch_add(code.value() as u64, Ordering::Relaxed);
            if self.channel.try_send(code.value() as u32).is_err() {
                Statistics::count(&stats.channel_dropped);
            }
        }
        self.channel.flush(now_us);
        count
    }

    /// Poll forever.
    pub fn run(&mut self, mut now_us: impl FnMut() -> u32, stats: &Statistics) -> ! {
        loop {
            self.poll(now_us(), stats);
        }
    }
}
