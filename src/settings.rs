//! Link settings
//!
//! # Design
//! All settings are fixed at build time from [crate::design_parameters]. They
//! are collected in one serializable structure so that a host build can
//! report them and so that setup code takes them from one place.
use ppm_codec::Calibration;
use serde::{Deserialize, Serialize};

use crate::{design_parameters as dp, format::AudioFormat};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Pulse width calibration of the generator/detector pair.
    pub calibration: Calibration,

    /// Stream format until the host selects one.
    pub format: AudioFormat,

    /// Statistics reporting interval in seconds.
    pub telemetry_period: u32,

    /// Codes per cross-core batch (semaphore ring only).
    pub rx_batch: usize,

    /// Partial cross-core batch timeout in microseconds.
    pub rx_flush_timeout: u32,

    /// Partial microphone packet timeout in microseconds.
    pub mic_flush_timeout: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calibration: dp::CALIBRATION,
            format: AudioFormat::new(dp::DEFAULT_SAMPLE_RATE, Default::default()),
            telemetry_period: dp::TELEMETRY_PERIOD_SECS,
            rx_batch: dp::RX_BATCH,
            rx_flush_timeout: dp::RX_FLUSH_TIMEOUT_US,
            mic_flush_timeout: dp::MIC_FLUSH_TIMEOUT_US,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.calibration.min_interval_cycles, 375);
        let json = serde_json_core::to_string::<_, 512>(&s).unwrap();
        let (back, _) = serde_json_core::from_str::<Settings>(&json).unwrap();
        assert_eq!(back, s);
    }
}
