use crate::{encode, Resolution};

/// Sample side of a line code: turns PCM samples into line words.
pub trait Encoder {
    /// Ingest one mono sample.
    ///
    /// # Returns
    /// A completed line word, if any.
    fn push(&mut self, sample: i32) -> Option<u32>;

    /// Select the input resolution and discard any partial word and
    /// modulator state.
    fn configure(&mut self, resolution: Resolution);
}

/// Symbol side of a line code: what the pulse hardware is fed.
pub trait LineCode {
    /// Sample ticks covered by one line word.
    const TICKS_PER_SYMBOL: u32;

    /// Hardware symbol for a line word.
    fn symbol(&self, word: u32) -> u32;

    /// Hardware symbol to send when no data is available.
    fn idle(&self) -> u32;

    /// Signal level carried by a line word, for statistics.
    fn level(&self, word: u32) -> u32;
}

/// PPM encoder: one code per sample.
#[derive(Copy, Clone, Debug, Default)]
pub struct PpmEncoder {
    resolution: Resolution,
}

impl PpmEncoder {
    pub const fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }
}

impl Encoder for PpmEncoder {
    fn push(&mut self, sample: i32) -> Option<u32> {
        Some(encode(sample, self.resolution).value() as u32)
    }

    fn configure(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }
}
