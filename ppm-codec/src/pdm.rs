use crate::{Encoder, LineCode, Resolution};

/// Second order delta-sigma modulator.
///
/// Two cascaded integrators of the error against the previous output, one
/// bit quantizer on the sign of the second integrator. The output is `+FS`
/// for a set bit and `-FS - 1` for a cleared one, so for a constant input `x`
/// the density of set bits approaches `(x - MIN) / (MAX - MIN)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeltaSigma {
    integrator1: i64,
    integrator2: i64,
    prev_output: i64,
}

impl DeltaSigma {
    /// Modulate one sample to one bit.
    pub fn step(&mut self, x: i32, resolution: Resolution) -> bool {
        let x = x as i64;
        self.integrator1 += x - self.prev_output;
        self.integrator2 += self.integrator1 - self.prev_output;
        let bit = self.integrator2 >= 0;
        self.prev_output = if bit {
            resolution.max() as i64
        } else {
            resolution.min() as i64
        };
        bit
    }

    /// Modulate up to 32 samples into one word, first sample in the LSB.
    pub fn modulate(&mut self, samples: &[i32], resolution: Resolution) -> u32 {
        samples
            .iter()
            .take(32)
            .enumerate()
            .fold(0, |word, (i, &x)| {
                word | ((self.step(x, resolution) as u32) << i)
            })
    }
}

/// PDM encoder: one 32 bit word per 32 samples.
#[derive(Copy, Clone, Debug, Default)]
pub struct PdmEncoder {
    modulator: DeltaSigma,
    resolution: Resolution,
    word: u32,
    bits: u32,
}

impl PdmEncoder {
    pub const BITS: u32 = u32::BITS;

    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }
}

impl Encoder for PdmEncoder {
    fn push(&mut self, sample: i32) -> Option<u32> {
        let bit = self.modulator.step(sample, self.resolution);
        self.word |= (bit as u32) << self.bits;
        self.bits += 1;
        (self.bits == Self::BITS).then(|| {
            self.bits = 0;
            core::mem::take(&mut self.word)
        })
    }

    fn configure(&mut self, resolution: Resolution) {
        *self = Self::new(resolution);
    }
}

/// PDM line code: words are shifted out verbatim, one bit per sample tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct PdmLine;

impl PdmLine {
    /// Zero signal: equal density of ones and zeros.
    pub const IDLE: u32 = 0xaaaa_aaaa;
}

impl LineCode for PdmLine {
    const TICKS_PER_SYMBOL: u32 = PdmEncoder::BITS;

    fn symbol(&self, word: u32) -> u32 {
        word
    }

    fn idle(&self) -> u32 {
        Self::IDLE
    }

    /// Number of set bits (pulse density).
    fn level(&self, word: u32) -> u32 {
        word.count_ones()
    }
}
