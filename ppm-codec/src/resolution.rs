use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// PCM sample bit depth.
///
/// The discriminant is the bit depth as negotiated with the host.
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
#[repr(u8)]
pub enum Resolution {
    #[default]
    Bits16 = 16,
    Bits24 = 24,
}

impl Resolution {
    /// Largest representable sample value.
    pub const fn max(self) -> i32 {
        match self {
            Self::Bits16 => i16::MAX as i32,
            Self::Bits24 => (1 << 23) - 1,
        }
    }

    /// Smallest representable sample value.
    pub const fn min(self) -> i32 {
        -self.max() - 1
    }

    /// Size of one sample on the wire.
    ///
    /// 24 bit samples travel left-justified in a 32 bit subslot.
    pub const fn subslot_bytes(self) -> usize {
        match self {
            Self::Bits16 => 2,
            Self::Bits24 => 4,
        }
    }

    /// Parse one little-endian sample from the start of `bytes`.
    ///
    /// # Panics
    /// If `bytes` is shorter than [Self::subslot_bytes].
    pub fn read_le(self, bytes: &[u8]) -> i32 {
        match self {
            Self::Bits16 => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
            Self::Bits24 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
                    >> 8
            }
        }
    }

    /// Write one little-endian sample into the start of `bytes`.
    ///
    /// The sample is clamped to the representable range.
    ///
    /// # Panics
    /// If `bytes` is shorter than [Self::subslot_bytes].
    pub fn write_le(self, sample: i32, bytes: &mut [u8]) {
        let sample = sample.clamp(self.min(), self.max());
        match self {
            Self::Bits16 => {
                bytes[..2].copy_from_slice(&(sample as i16).to_le_bytes())
            }
            Self::Bits24 => bytes[..4].copy_from_slice(&(sample << 8).to_le_bytes()),
        }
    }
}

/// Stereo to mono downmix.
///
/// Both channels are halved first so the sum cannot overflow.
pub const fn downmix(left: i32, right: i32) -> i32 {
    (left >> 1) + (right >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(Resolution::try_from(16u8).ok(), Some(Resolution::Bits16));
        assert_eq!(Resolution::try_from(24u8).ok(), Some(Resolution::Bits24));
        assert!(Resolution::try_from(20u8).is_err());
        assert_eq!(u8::from(Resolution::Bits24), 24);
    }

    #[test]
    fn subslots() {
        let mut buf = [0u8; 4];
        Resolution::Bits24.write_le(-0x12_3456, &mut buf);
        assert_eq!(buf[0], 0);
        assert_eq!(Resolution::Bits24.read_le(&buf), -0x12_3456);

        Resolution::Bits16.write_le(i32::MAX, &mut buf);
        assert_eq!(Resolution::Bits16.read_le(&buf), i16::MAX as i32);
    }

    #[test]
    fn downmix_extremes() {
        assert_eq!(downmix(i16::MAX as _, i16::MAX as _), i16::MAX as i32 - 1);
        assert_eq!(downmix(i16::MIN as _, i16::MIN as _), i16::MIN as i32);
        assert_eq!(downmix(1000, -1000), 0);
    }
}
