use arbitrary_int::u10;
use serde::{Deserialize, Serialize};

use crate::{saturate, LineCode};

/// Number of pulse ticks in a period of `period_ns` nanoseconds.
///
/// # Args
/// * `sys_clock_khz` - State machine clock in kHz.
/// * `period_ns` - Duration to convert.
/// * `cycles_per_tick` - State machine cycles per counted tick.
pub const fn interval_ticks(
    sys_clock_khz: u32,
    period_ns: u32,
    cycles_per_tick: u32,
) -> u32 {
    (sys_clock_khz as u64 * period_ns as u64
        / cycles_per_tick as u64
        / 1_000_000) as u32
}

/// Pulse width calibration of a generator/detector pair.
///
/// A code is transmitted as a low phase of `min_interval_cycles + code`
/// ticks. The detector reports the low time shortened by a fixed latency
/// which `min_tackt` compensates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    /// Hardware latency compensation in ticks. Determined empirically for a
    /// given system clock.
    pub min_tackt: u32,
    /// Pulse width of code 0 in ticks.
    pub min_interval_cycles: u32,
    /// Largest corrected width still accepted as a code.
    pub max_code: u32,
}

impl Calibration {
    pub const fn new(
        min_tackt: u32,
        min_interval_cycles: u32,
        max_code: u32,
    ) -> Self {
        Self {
            min_tackt,
            min_interval_cycles,
            max_code,
        }
    }

    /// Pulse width (in ticks) to transmit for `code`.
    pub fn width_sent(&self, code: u10) -> u32 {
        self.min_interval_cycles + code.value() as u32
    }

    /// Remove floor width and latency from a measured width.
    pub fn corrected_width(&self, measured: u32) -> i64 {
        measured as i64 + self.min_tackt as i64
            - self.min_interval_cycles as i64
    }

    /// Range check a measured width.
    ///
    /// # Returns
    /// The code if the corrected width is in `(0, max_code]`, `None` if the
    /// measurement is noise.
    pub fn accept(&self, measured: u32) -> Option<u10> {
        let corrected = self.corrected_width(measured);
        (corrected > 0 && corrected <= self.max_code as i64)
            .then(|| saturate(corrected as u32))
    }

    /// What a detector with exactly the compensated latency reports for a
    /// pulse of `width` ticks.
    pub fn ideal_measurement(&self, width: u32) -> u32 {
        width.saturating_sub(self.min_tackt)
    }
}

impl LineCode for Calibration {
    const TICKS_PER_SYMBOL: u32 = 1;

    fn symbol(&self, word: u32) -> u32 {
        self.width_sent(saturate(word))
    }

    fn idle(&self) -> u32 {
        self.min_interval_cycles
    }

    fn level(&self, word: u32) -> u32 {
        saturate(word).value() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAL: Calibration = Calibration::new(10, 375, 1024);

    #[test]
    fn interval() {
        assert_eq!(interval_ticks(250_000, 3_000, 2), 375);
        assert_eq!(interval_ticks(125_000, 3_000, 2), 187);
    }

    #[test]
    fn noise() {
        assert_eq!(CAL.accept(0), None);
        // Corrected width 0 is the floor, not a code.
        assert_eq!(CAL.accept(365), None);
        assert_eq!(CAL.accept(366).map(u10::value), Some(1));
        assert_eq!(CAL.accept(365 + 1024).map(u10::value), Some(1023));
        assert_eq!(CAL.accept(365 + 1025), None);
        assert_eq!(CAL.accept(u32::MAX), None);
    }

    #[test]
    fn silence() {
        assert_eq!(CAL.idle(), 375);
        assert_eq!(CAL.symbol(0), 375);
        assert_eq!(CAL.symbol(1023), 375 + 1023);
    }
}
