use portable_atomic::{AtomicU32, AtomicU64, Ordering};
use serde::Serialize;

/// Link statistics, updated from every execution context on both cores.
///
/// # Note
/// The counters are advisory. They are updated with relaxed ordering and
/// [Statistics::take] is not atomic as a whole: an event racing the
/// snapshot may be attributed to either interval.
#[derive(Default)]
pub struct Statistics {
    /// Speaker PCM samples (mono, after downmix) received from the host.
    pub pcm_received: AtomicU32,
    /// Line words encoded from speaker samples.
    pub ppm_converted: AtomicU32,
    /// Codes decoded to microphone samples.
    pub pcm_converted: AtomicU32,
    /// Data symbols handed to the pulse generator.
    pub ppm_sent: AtomicU32,
    /// Silence symbols handed to the pulse generator.
    pub silence_ticks: AtomicU32,
    /// Ticks where the generator queue had no room.
    pub generator_overflows: AtomicU32,
    /// Codes accepted by the receive loop.
    pub ppm_received: AtomicU32,
    /// Measured widths outside the code range.
    pub noise_dropped: AtomicU32,
    /// Codes dropped because the cross-core channel was saturated.
    pub channel_dropped: AtomicU32,
    /// Speaker packets, or words of an oversized packet, read from the host
    /// but not queued for transmission.
    pub speaker_rejected: AtomicU32,
    /// Microphone samples dropped because both slots were in use.
    pub mic_dropped: AtomicU32,
    /// Microphone bytes handed to the host.
    pub bytes_to_host: AtomicU32,
    /// Sum of transmitted codes.
    pub summed_ppm_out: AtomicU64,
    /// Sum of received codes.
    pub summed_ppm_in: AtomicU64,
}

/// Counter values over one reporting interval.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryBuffer {
    pub pcm_received: u32,
    pub ppm_converted: u32,
    pub pcm_converted: u32,
    pub ppm_sent: u32,
    pub silence_ticks: u32,
    pub generator_overflows: u32,
    pub ppm_received: u32,
    pub noise_dropped: u32,
    pub channel_dropped: u32,
    pub speaker_rejected: u32,
    pub mic_dropped: u32,
    pub bytes_to_host: u32,
    pub summed_ppm_out: u64,
    pub summed_ppm_in: u64,
}

/// Reported statistics.
#[derive(Serialize, Debug, PartialEq)]
pub struct Telemetry {
    pub pcm_received: u32,
    pub ppm_converted: u32,
    pub pcm_converted: u32,
    pub ppm_sent: u32,
    pub silence_ticks: u32,
    pub generator_overflows: u32,
    pub ppm_received: u32,
    pub noise_dropped: u32,
    pub channel_dropped: u32,
    pub speaker_rejected: u32,
    pub mic_dropped: u32,
    pub bytes_to_host: u32,

    /// Symbols per second handed to the generator, data and idle.
    pub symbol_rate: f32,

    /// Received codes per second.
    pub receive_rate: f32,

    /// Mean transmitted code. A slow drift between the two ends with the
    /// same audio indicates a calibration error.
    pub mean_ppm_out: f32,

    /// Mean received code.
    pub mean_ppm_in: f32,
}

impl Statistics {
    pub const fn new() -> Self {
        Self {
            pcm_received: AtomicU32::new(0),
            ppm_converted: AtomicU32::new(0),
            pcm_converted: AtomicU32::new(0),
            ppm_sent: AtomicU32::new(0),
            silence_ticks: AtomicU32::new(0),
            generator_overflows: AtomicU32::new(0),
            ppm_received: AtomicU32::new(0),
            noise_dropped: AtomicU32::new(0),
            channel_dropped: AtomicU32::new(0),
            speaker_rejected: AtomicU32::new(0),
            mic_dropped: AtomicU32::new(0),
            bytes_to_host: AtomicU32::new(0),
            summed_ppm_out: AtomicU64::new(0),
            summed_ppm_in: AtomicU64::new(0),
        }
    }

    /// Count one event.
    pub fn count(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and clear all counters.
    pub fn take(&self) -> TelemetryBuffer {
        let t = |c: &AtomicU32| c.swap(0, Ordering::Relaxed);
        TelemetryBuffer {
            pcm_received: t(&self.pcm_received),
            ppm_converted: t(&self.ppm_converted),
            pcm_converted: t(&self.pcm_converted),
            ppm_sent: t(&self.ppm_sent),
            silence_ticks: t(&self.silence_ticks),
            generator_overflows: t(&self.generator_overflows),
            ppm_received: t(&self.ppm_received),
            noise_dropped: t(&self.noise_dropped),
            channel_dropped: t(&self.channel_dropped),
            speaker_rejected: t(&self.speaker_rejected),
            mic_dropped: t(&self.mic_dropped),
            bytes_to_host: t(&self.bytes_to_host),
            summed_ppm_out: self.summed_ppm_out.swap(0, Ordering::Relaxed),
            summed_ppm_in: self.summed_ppm_in.swap(0, Ordering::Relaxed),
        }
    }
}

impl TelemetryBuffer {
    /// Convert the counters to rates and means for reporting.
    ///
    /// # Args
    /// * `period_secs` - Length of the interval the counters cover.
    pub fn finalize(self, period_secs: u32) -> Telemetry {
        let rate = |n: u32| n as f32 / period_secs.max(1) as f32;
        let mean = |sum: u64, n: u32| {
            if n == 0 {
                0.
            } else {
                (sum as f64 / n as f64) as f32
            }
        };
        Telemetry {
            symbol_rate: rate(self.ppm_sent + self.silence_ticks),
            receive_rate: rate(self.ppm_received),
            mean_ppm_out: mean(self.summed_ppm_out, self.ppm_sent),
            mean_ppm_in: mean(self.summed_ppm_in, self.ppm_received),
            pcm_received: self.pcm_received,
            ppm_converted: self.ppm_converted,
            pcm_converted: self.pcm_converted,
            ppm_sent: self.ppm_sent,
            silence_ticks: self.silence_ticks,
            generator_overflows: self.generator_overflows,
            ppm_received: self.ppm_received,
            noise_dropped: self.noise_dropped,
            channel_dropped: self.channel_dropped,
            speaker_rejected: self.speaker_rejected,
            mic_dropped: self.mic_dropped,
            bytes_to_host: self.bytes_to_host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_resets() {
        let stats = Statistics::new();
        for code in [500u64, 520] {
            Statistics::count(&stats.ppm_sent);
            stats.summed_ppm_out.fetch_add(code, Ordering::Relaxed);
        }
        Statistics::count(&stats.silence_ticks);
        Statistics::count(&stats.noise_dropped);
        let t = stats.take().finalize(3);
        assert_eq!(t.ppm_sent, 2);
        assert_eq!(t.noise_dropped, 1);
        assert_eq!(t.symbol_rate, 1.);
        assert_eq!(t.mean_ppm_out, 510.);
        assert_eq!(t.mean_ppm_in, 0.);
        assert_eq!(stats.take(), TelemetryBuffer::default());
    }

    #[test]
    fn serialize() {
        let t = TelemetryBuffer::default().finalize(15);
        let s = serde_json_core::to_string::<_, 512>(&t).unwrap();
        assert!(s.starts_with("{\"pcm_received\":0,"));
    }
}
