use handoff::{Receiver, Writer};
use ppm_codec::{decode, saturate};

use crate::{
    format::{AudioFormat, FormatControl},
    telemetry::Statistics,
};

/// Received codes to host microphone packets.
///
/// Codes are decoded and assembled into packets of one nominal USB frame.
/// A packet is published when it is full or when no sample arrived for
/// `timeout_us`. When both buffer slots are with the host side, the newest
/// samples are dropped.
pub struct MicrophonePath<'a, R, const N: usize> {
    channel: R,
    writer: Writer<'a, u8, N>,
    format: AudioFormat,
    epoch: u32,
    channels: usize,
    timeout_us: u32,
    last: Option<u32>,
}

impl<'a, R: Receiver, const N: usize> MicrophonePath<'a, R, N> {
    /// # Args
    /// * `channel` - Receiving end of the cross-core channel.
    /// * `writer` - Producer end of the microphone buffer.
    /// * `control` - The shared stream format.
    /// * `channels` - Channels per host frame (1 or 2). The mono link is
    ///   duplicated into all of them.
    /// * `timeout_us` - Publish a partial packet after this much silence.
    pub fn new(
        channel: R,
        writer: Writer<'a, u8, N>,
        control: &FormatControl,
        channels: usize,
        timeout_us: u32,
    ) -> Self {
        Self {
            channel,
            writer,
            format: control.current(),
            epoch: control.epoch(),
            channels: channels.clamp(1, 2),
            timeout_us,
            last: None,
        }
    }

    /// Bytes per published packet.
    pub fn packet_bytes(&self) -> usize {
        self.format.packet_bytes(self.channels).min(N)
    }

    /// Move received codes into packets.
    ///
    /// # Args
    /// * `now_us` - Current time, drives partial packet publishing.
    /// * `control` - The shared stream format. A change discards pending
    ///   data.
    /// * `stats` - Statistics to update.
    ///
    /// # Returns
    /// True if the host side has work: a packet was published or a discard
    /// waits for the reader to carry it out.
    pub fn poll(
        &mut self,
        now_us: u32,
        control: &FormatControl,
        stats: &Statistics,
    ) -> bool {
        let epoch = control.epoch();
        if epoch != self.epoch {
            self.epoch = epoch;
            self.format = control.current();
            self.writer.reset();
            self.last = None;
        }

        let resolution = self.format.resolution;
        let subslot = resolution.subslot_bytes();
        let frame_bytes = self.format.frame_bytes(self.channels);
        let packet_bytes = self.packet_bytes();
        let mut published = false;

        while let Some(word) = self.channel.try_recv() {
            let sample = decode(saturate(word), resolution);
            Statistics::count(&stats.pcm_converted);
            let mut frame = [0; 8];
            for subframe in frame[..frame_bytes].chunks_exact_mut(subslot) {
                resolution.write_le(sample, subframe);
            }
            if self.writer.extend(&frame[..frame_bytes]).is_err() {
                Statistics::count(&stats.mic_dropped);
                continue;
            }
            self.last = Some(now_us);
            if self.writer.pending() + frame_bytes > packet_bytes {
                published |= self.publish();
            }
        }

        if let Some(last) = self.last {
            if now_us.wrapping_sub(last) >= self.timeout_us {
                published |= self.publish();
            }
        }
        published || self.writer.is_flushing()
    }

    fn publish(&mut self) -> bool {
        self.last = None;
        matches!(self.writer.publish(), Ok(n) if n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatRequest, SampleRate};
    use handoff::DoubleBuffer;
    use ppm_codec::Resolution;

    struct Codes(Vec<u32>);

    impl Receiver for Codes {
        fn try_recv(&mut self) -> Option<u32> {
            (!self.0.is_empty()).then(|| self.0.remove(0))
        }
    }

    fn mono16(packet: &[u8]) -> Vec<i16> {
        packet
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn full_packets() {
        let stats = Statistics::new();
        let control = FormatControl::new(AudioFormat::default());
        let mut buf = DoubleBuffer::<u8, 196>::new(0);
        let (w, mut r) = buf.split();
        let mut mic = MicrophonePath::new(Codes(vec![]), w, &control, 1, 1_000);
        assert_eq!(mic.packet_bytes(), 96);
        mic.channel.0 = (0..50).map(|i| 511 + i % 2).collect();
        assert!(mic.poll(0, &control, &stats));
        assert!(r.consume(|p| {
            assert_eq!(p.len(), 96);
            let s = mono16(p);
            assert!(s[0] > 0 && s[1] > 0);
            true
        }));
        // The rest follows after the timeout.
        assert!(!mic.poll(999, &control, &stats));
        assert!(mic.poll(1_000, &control, &stats));
        assert!(r.consume(|p| p.len() == 4));
        assert_eq!(stats.take().pcm_converted, 50);
    }

    #[test]
    fn drops_newest_when_busy() {
        let stats = Statistics::new();
        let control = FormatControl::new(AudioFormat::default());
        let mut buf = DoubleBuffer::<u8, 196>::new(0);
        let (w, mut r) = buf.split();
        let mut mic = MicrophonePath::new(Codes(vec![]), w, &control, 1, 1_000);
        mic.channel.0 = vec![0; 48 * 3];
        mic.poll(0, &control, &stats);
        assert_eq!(stats.take().mic_dropped, 48);
        assert_eq!(r.ready_slots(), 2);
        assert!(r.consume(|p| mono16(p).iter().all(|&s| s == i16::MIN)));
    }

    #[test]
    fn format_change_resets() {
        let stats = Statistics::new();
        let control = FormatControl::new(AudioFormat::default());
        let mut buf = DoubleBuffer::<u8, 196>::new(0);
        let (w, mut r) = buf.split();
        let mut mic = MicrophonePath::new(Codes(vec![]), w, &control, 1, 1_000);
        mic.channel.0 = vec![1023; 48];
        mic.poll(0, &control, &stats);
        assert_eq!(r.ready_slots(), 1);

        let f = control
            .resolve(FormatRequest::SampleRate(44_100))
            .unwrap();
        control.commit(f);
        mic.channel.0 = vec![1023; 10];
        assert!(mic.poll(10, &control, &stats));
        assert_eq!(mic.packet_bytes(), 90);
        // Writes wait for the reader to carry out the reset.
        assert_eq!(stats.take().mic_dropped, 10);
        assert!(!r.consume(|_| true));
        assert_eq!(r.ready_slots(), 0);

        let f = control
            .resolve(FormatRequest::Resolution(24))
            .unwrap();
        control.commit(f);
        mic.poll(15, &control, &stats);
        assert!(!r.consume(|_| true));
        mic.channel.0 = vec![1023; 45];
        assert!(mic.poll(20, &control, &stats));
        assert!(r.consume(|p| {
            p.len() == 180
                && p.chunks_exact(4).all(|s| {
                    Resolution::Bits24.read_le(s) == Resolution::Bits24.max()
                })
        }));
        assert_eq!(control.current().rate, SampleRate::Hz44100);
    }

    #[test]
    fn restart_requests_service() {
        let stats = Statistics::new();
        let control = FormatControl::new(AudioFormat::default());
        let mut buf = DoubleBuffer::<u8, 196>::new(0);
        let (w, mut r) = buf.split();
        let mut mic = MicrophonePath::new(Codes(vec![]), w, &control, 1, 1_000);

        let f = control.resolve(FormatRequest::Restart).unwrap();
        control.commit(f);
        // Nothing was published, the discard alone needs the reader.
        mic.channel.0 = vec![700; 5];
        assert!(mic.poll(0, &control, &stats));
        assert!(mic.poll(1, &control, &stats));
        assert_eq!(stats.take().mic_dropped, 5);

        // Servicing the reader carries out the discard.
        assert!(!r.consume(|_| true));
        mic.channel.0 = vec![700; 48];
        assert!(mic.poll(2, &control, &stats));
        assert!(r.consume(|p| p.len() == 96));
        let t = stats.take();
        assert_eq!(t.mic_dropped, 0);
        assert_eq!(t.pcm_converted, 48);
        assert!(!mic.poll(3, &control, &stats));
    }
}
