use arbitrary_int::u10;

use crate::Resolution;

/// The code of the smallest non-negative sample.
///
/// Codes `ZERO..=1023` carry non-negative samples, `0..ZERO` negative ones.
pub const ZERO: u16 = 511;

const POSITIVE_STEPS: i64 = 1023 - ZERO as i64;
const NEGATIVE_STEPS: i64 = ZERO as i64 - 1;

/// Quantize a PCM sample to a PPM code.
///
/// Linear in each half: `511 + sample*512/MAX` for non-negative samples and
/// the mirror image `510 - (-sample - 1)*510/MAX` for negative ones. The full
/// scale limits map to the code range limits and zero sits on the 511/512
/// boundary.
///
/// Samples outside the range of `resolution` are clamped.
pub fn encode(sample: i32, resolution: Resolution) -> u10 {
    let max = resolution.max() as i64;
    let sample = (sample as i64).clamp(-max - 1, max);
    let code = if sample >= 0 {
        ZERO as i64 + sample * POSITIVE_STEPS / max
    } else {
        NEGATIVE_STEPS - (-sample - 1) * NEGATIVE_STEPS / max
    };
    u10::new(code as u16)
}

/// Reconstruct a PCM sample from a PPM code.
///
/// Returns the center of the code's quantization interval. The extreme codes
/// map to the full scale limits.
pub fn decode(code: u10, resolution: Resolution) -> i32 {
    let max = resolution.max() as i64;
    let code = code.value() as i64;
    if code >= ZERO as i64 {
        let q = code - ZERO as i64;
        ((2 * q + 1) * max / (2 * POSITIVE_STEPS)).min(max) as i32
    } else {
        let q = NEGATIVE_STEPS - code;
        (-1 - ((2 * q + 1) * max / (2 * NEGATIVE_STEPS)).min(max)) as i32
    }
}

/// Convert a received (already range checked) code word to a [u10].
///
/// The top of the accepted range, `MAX_CODE = 1024`, does not fit into ten
/// bits and saturates.
pub fn saturate(word: u32) -> u10 {
    u10::new(word.min(1023) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits() {
        let r = Resolution::Bits16;
        assert_eq!(encode(i16::MIN as _, r).value(), 0);
        assert_eq!(encode(-1, r).value(), ZERO - 1);
        assert_eq!(encode(0, r).value(), ZERO);
        assert_eq!(encode(i16::MAX as _, r).value(), 1023);
        assert_eq!(decode(u10::new(0), r), i16::MIN as i32);
        assert_eq!(decode(u10::new(1023), r), i16::MAX as i32);
    }

    #[test]
    fn clamped() {
        let r = Resolution::Bits16;
        assert_eq!(encode(1 << 20, r).value(), 1023);
        assert_eq!(encode(-(1 << 20), r).value(), 0);
    }

    #[test]
    fn saturation() {
        assert_eq!(saturate(1).value(), 1);
        assert_eq!(saturate(1023).value(), 1023);
        assert_eq!(saturate(1024).value(), 1023);
    }
}
