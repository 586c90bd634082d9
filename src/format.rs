//! Audio stream format negotiated with the host.
//!
//! The host selects a sample rate and resolution. Requests are validated
//! against what the link supports ([FormatControl::resolve]) and committed
//! only after every buffer depending on the old format has been reset
//! ([FormatControl::commit]).
use num_enum::{IntoPrimitive, TryFromPrimitive};
use portable_atomic::{AtomicU32, AtomicU8, Ordering};
use ppm_codec::Resolution;
use serde::{Deserialize, Serialize};

/// Supported audio sample rates.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
#[repr(u32)]
pub enum SampleRate {
    Hz44100 = 44_100,
    #[default]
    Hz48000 = 48_000,
}

impl SampleRate {
    pub const fn hz(self) -> u32 {
        self as u32
    }

    /// Most frames the host sends per 1 ms USB frame.
    pub const fn max_frames_per_ms(self) -> usize {
        self.hz().div_ceil(1000) as usize
    }

    /// Infer the rate from the number of frames in a 1 ms packet.
    ///
    /// Adaptive hosts vary the packet size by one frame around the
    /// nominal rate.
    pub const fn from_frames_per_ms(frames: usize) -> Option<Self> {
        match frames {
            44 | 45 => Some(Self::Hz44100),
            47..=49 => Some(Self::Hz48000),
            _ => None,
        }
    }
}

/// A complete stream format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub rate: SampleRate,
    pub resolution: Resolution,
}

impl AudioFormat {
    pub const fn new(rate: SampleRate, resolution: Resolution) -> Self {
        Self { rate, resolution }
    }

    /// Bytes of one frame with `channels` subslots.
    pub const fn frame_bytes(&self, channels: usize) -> usize {
        self.resolution.subslot_bytes() * channels
    }

    /// Bytes of the nominal 1 ms packet with `channels` subslots.
    pub const fn packet_bytes(&self, channels: usize) -> usize {
        self.rate.max_frames_per_ms() * self.frame_bytes(channels)
    }
}

/// A format change requested by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormatRequest {
    /// Switch to the given rate in Hz.
    SampleRate(u32),
    /// Switch to the given bit depth.
    Resolution(u8),
    /// The stream was (re)started. Keep the format but drop stale data.
    Restart,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Unsupported sample rate: {0} Hz")]
    UnsupportedRate(u32),
    #[error("Unsupported resolution: {0} bit")]
    UnsupportedResolution(u8),
}

/// The active format, shared between execution contexts.
///
/// The epoch increments with every commit so that consumers caching format
/// dependent state can detect changes (including restarts to the same
/// format).
pub struct FormatControl {
    rate: AtomicU32,
    resolution: AtomicU8,
    epoch: AtomicU32,
}

impl FormatControl {
    pub const fn new(format: AudioFormat) -> Self {
        Self {
            rate: AtomicU32::new(format.rate.hz()),
            resolution: AtomicU8::new(format.resolution as u8),
            epoch: AtomicU32::new(0),
        }
    }

    /// The committed format.
    pub fn current(&self) -> AudioFormat {
        // Only valid values are ever stored.
        AudioFormat {
            rate: SampleRate::try_from(self.rate.load(Ordering::Acquire))
                .unwrap_or_default(),
            resolution: Resolution::try_from(
                self.resolution.load(Ordering::Acquire),
            )
            .unwrap_or_default(),
        }
    }

    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Validate a request against the current format.
    ///
    /// # Returns
    /// The format to switch to. Nothing is committed yet.
    pub fn resolve(
        &self,
        request: FormatRequest,
    ) -> Result<AudioFormat, FormatError> {
        let mut format = self.current();
        match request {
            FormatRequest::SampleRate(hz) => {
                format.rate = SampleRate::try_from(hz)
                    .map_err(|_| FormatError::UnsupportedRate(hz))?;
            }
            FormatRequest::Resolution(bits) => {
                format.resolution = Resolution::try_from(bits)
                    .map_err(|_| FormatError::UnsupportedResolution(bits))?;
            }
            FormatRequest::Restart => {}
        }
        Ok(format)
    }

    /// Make `format` the active one.
    pub fn commit(&self, format: AudioFormat) {
        self.rate.store(format.rate.hz(), Ordering::Relaxed);
        self.resolution
            .store(format.resolution as u8, Ordering::Relaxed);
        self.epoch.fetch_add(1, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames() {
        assert_eq!(SampleRate::Hz44100.max_frames_per_ms(), 45);
        assert_eq!(SampleRate::Hz48000.max_frames_per_ms(), 48);
        assert_eq!(SampleRate::from_frames_per_ms(44), Some(SampleRate::Hz44100));
        assert_eq!(SampleRate::from_frames_per_ms(49), Some(SampleRate::Hz48000));
        assert_eq!(SampleRate::from_frames_per_ms(32), None);
        let f = AudioFormat::new(SampleRate::Hz48000, Resolution::Bits24);
        assert_eq!(f.packet_bytes(2), 48 * 2 * 4);
    }

    #[test]
    fn resolve() {
        let control = FormatControl::new(AudioFormat::default());
        assert_eq!(
            control.resolve(FormatRequest::SampleRate(96_000)),
            Err(FormatError::UnsupportedRate(96_000))
        );
        assert_eq!(
            control.resolve(FormatRequest::Resolution(20)),
            Err(FormatError::UnsupportedResolution(20))
        );
        // Rejected requests leave the format alone.
        assert_eq!(control.current(), AudioFormat::default());
        assert_eq!(control.epoch(), 0);

        let f = control.resolve(FormatRequest::SampleRate(44_100)).unwrap();
        assert_eq!(f.rate, SampleRate::Hz44100);
        assert_eq!(control.current().rate, SampleRate::Hz48000);
        control.commit(f);
        assert_eq!(control.current(), f);
        assert_eq!(control.epoch(), 1);

        let f = control.resolve(FormatRequest::Restart).unwrap();
        control.commit(f);
        assert_eq!(control.epoch(), 2);
    }
}
