use handoff::{Error, Writer};
use ppm_codec::{downmix, Encoder};

use crate::{format::AudioFormat, telemetry::Statistics};

/// Host speaker stream to line words.
///
/// Every packet is parsed into frames, downmixed to mono, encoded and
/// published to the transmit buffer as one unit.
pub struct SpeakerPath<'a, E, const N: usize> {
    encoder: E,
    writer: Writer<'a, u32, N>,
    format: AudioFormat,
    channels: usize,
}

impl<'a, E: Encoder, const N: usize> SpeakerPath<'a, E, N> {
    /// # Args
    /// * `encoder` - Line code sample side.
    /// * `writer` - Producer end of the transmit buffer.
    /// * `format` - Initial stream format.
    /// * `channels` - Interleaved channels per frame (1 or 2).
    pub fn new(
        mut encoder: E,
        writer: Writer<'a, u32, N>,
        format: AudioFormat,
        channels: usize,
    ) -> Self {
        encoder.configure(format.resolution);
        Self {
            encoder,
            writer,
            format,
            channels: channels.clamp(1, 2),
        }
    }

    /// Whether a packet would be accepted now.
    pub fn ready(&self) -> bool {
        self.writer.can_write()
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Switch the stream format.
    ///
    /// Queued words and encoder state are discarded.
    pub fn set_format(&mut self, format: AudioFormat) {
        self.encoder.configure(format.resolution);
        self.writer.reset();
        self.format = format;
    }

    /// Encode and publish one host packet.
    ///
    /// A trailing partial frame is ignored. Words beyond the slot capacity
    /// are counted as rejected.
    ///
    /// # Returns
    /// The number of line words published or [Error::Busy] if both buffer
    /// slots are still in use. Nothing is consumed in that case.
    pub fn process(
        &mut self,
        packet: &[u8],
        stats: &Statistics,
    ) -> Result<usize, Error> {
        let resolution = self.format.resolution;
        let subslot = resolution.subslot_bytes();
        let frame_bytes = self.format.frame_bytes(self.channels);
        let encoder = &mut self.encoder;
        self.writer.publish_with(|words| {
            let mut len = 0;
            for frame in packet.chunks_exact(frame_bytes) {
                let left = resolution.read_le(frame);
                let sample = if frame_bytes > subslot {
                    downmix(left, resolution.read_le(&frame[subslot..]))
                } else {
                    left
                };
                Statistics::count(&stats.pcm_received);
                if let Some(word) = encoder.push(sample) {
                    Statistics::count(&stats.ppm_converted);
                    match words.get_mut(len) {
                        Some(w) => {
                            *w = word;
                            len += 1;
                        }
                        None => Statistics::count(&stats.speaker_rejected),
                    }
                }
            }
            len
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SampleRate;
    use handoff::DoubleBuffer;
    use ppm_codec::{PdmEncoder, PpmEncoder, Resolution};

    fn stereo16(frames: &[(i16, i16)]) -> Vec<u8> {
        frames
            .iter()
            .flat_map(|(l, r)| l.to_le_bytes().into_iter().chain(r.to_le_bytes()))
            .collect()
    }

    #[test]
    fn downmix_and_encode() {
        let stats = Statistics::new();
        let mut buf = DoubleBuffer::<u32, 8>::new(0);
        let (w, mut r) = buf.split();
        let mut speaker =
            SpeakerPath::new(PpmEncoder::default(), w, AudioFormat::default(), 2);
        let packet = stereo16(&[(0, 0), (i16::MAX, i16::MAX), (i16::MIN, i16::MIN)]);
        assert_eq!(speaker.process(&packet, &stats), Ok(3));
        // A trailing partial frame is ignored.
        assert_eq!(speaker.process(&[1, 2, 3], &stats), Ok(0));
        let words: Vec<u32> = core::iter::from_fn(|| r.pop()).collect();
        assert_eq!(words[0], 511);
        assert_eq!(words[1], 1022);
        assert_eq!(words[2], 0);
        assert_eq!(stats.take().pcm_received, 3);
    }

    #[test]
    fn oversized_packet_is_counted() {
        let stats = Statistics::new();
        let mut buf = DoubleBuffer::<u32, 2>::new(0);
        let (w, mut r) = buf.split();
        let mut speaker =
            SpeakerPath::new(PpmEncoder::default(), w, AudioFormat::default(), 2);
        let packet = stereo16(&[(0, 0), (1000, 1000), (-1000, -1000)]);
        assert_eq!(speaker.process(&packet, &stats), Ok(2));
        let t = stats.take();
        assert_eq!(t.pcm_received, 3);
        assert_eq!(t.ppm_converted, 3);
        assert_eq!(t.speaker_rejected, 1);
        assert_eq!(r.pop(), Some(511));
        assert!(r.pop().is_some());
        assert_eq!(r.pop(), None);
    }

    #[test]
    fn busy_keeps_packet() {
        let stats = Statistics::new();
        let mut buf = DoubleBuffer::<u32, 8>::new(0);
        let (w, mut r) = buf.split();
        let mut speaker =
            SpeakerPath::new(PpmEncoder::default(), w, AudioFormat::default(), 2);
        let packet = stereo16(&[(100, 100)]);
        speaker.process(&packet, &stats).unwrap();
        speaker.process(&packet, &stats).unwrap();
        assert!(!speaker.ready());
        assert_eq!(speaker.process(&packet, &stats), Err(Error::Busy));
        assert_eq!(stats.take().pcm_received, 2);
        r.pop();
        assert!(speaker.ready());
    }

    #[test]
    fn format_change_flushes() {
        let stats = Statistics::new();
        let mut buf = DoubleBuffer::<u32, 64>::new(0);
        let (w, mut r) = buf.split();
        let mut speaker =
            SpeakerPath::new(PdmEncoder::default(), w, AudioFormat::default(), 1);
        let mono: Vec<u8> = (0..40i16).flat_map(|_| 0i16.to_le_bytes()).collect();
        assert_eq!(speaker.process(&mono, &stats), Ok(1));
        let f = AudioFormat::new(SampleRate::Hz44100, Resolution::Bits24);
        speaker.set_format(f);
        assert_eq!(speaker.format(), f);
        // The reader carries out the reset and finds nothing.
        assert_eq!(r.pop(), None);
        // The partial PDM word was dropped: 32 fresh 24 bit samples make a word.
        let mono: Vec<u8> = (0..32).flat_map(|_| [0u8; 4]).collect();
        assert_eq!(speaker.process(&mono, &stats), Ok(1));
        assert!(r.pop().is_some());
    }
}
