//! Host audio interface.
//!
//! The host side is abstracted by [AudioBridge]. [service] is the body of the
//! USB task: it applies format requests, moves one speaker packet into the
//! transmit path and hands one microphone packet to the host.
use handoff::Reader;
use ppm_codec::Encoder;

use crate::{
    format::{FormatControl, FormatRequest, SampleRate},
    speaker::SpeakerPath,
    telemetry::Statistics,
};

/// The host's audio endpoints.
pub trait AudioBridge {
    /// Read the next speaker packet into `buf`.
    ///
    /// A packet not read stays with the host side (NAK) and is offered again.
    ///
    /// # Returns
    /// The packet size if one was available.
    fn read_speaker(&mut self, buf: &mut [u8]) -> Option<usize>;

    /// Queue a microphone packet.
    ///
    /// # Returns
    /// False if the endpoint is busy. The packet should be offered again.
    fn write_microphone(&mut self, packet: &[u8]) -> bool;

    /// Take a pending format change request.
    fn poll_request(&mut self) -> Option<FormatRequest>;
}

/// Apply a format request.
///
/// The transmit buffer is reset before the new format is committed, so the
/// sample tick never drains old data at the new rate. The microphone path
/// resets itself when it sees the commit.
///
/// # Returns
/// Whether the request was accepted.
pub fn apply_request<E: Encoder, const N: usize>(
    request: FormatRequest,
    speaker: &mut SpeakerPath<'_, E, N>,
    control: &FormatControl,
) -> bool {
    match control.resolve(request) {
        Ok(format) => {
            speaker.set_format(format);
            control.commit(format);
            log::info!("Audio format: {format:?}");
            true
        }
        Err(err) => {
            log::warn!("Rejected {request:?}: {err}");
            false
        }
    }
}

/// Service the host endpoints once.
///
/// # Args
/// * `bridge` - The host endpoints.
/// * `speaker` - Transmit path.
/// * `microphone` - Consumer end of the microphone buffer.
/// * `control` - The shared stream format.
/// * `stats` - Statistics to update.
/// * `buf` - Scratch space for one speaker packet.
pub fn service<B, E, const TX: usize, const MIC: usize>(
    bridge: &mut B,
    speaker: &mut SpeakerPath<'_, E, TX>,
    microphone: &mut Reader<'_, u8, MIC>,
    control: &FormatControl,
    stats: &Statistics,
    buf: &mut [u8],
) where
    B: AudioBridge,
    E: Encoder,
{
    while let Some(request) = bridge.poll_request() {
        apply_request(request, speaker, control);
    }

    if speaker.ready() {
        if let Some(len) = bridge.read_speaker(buf) {
            let packet = &buf[..len.min(buf.len())];
            let format = speaker.format();
            // Adaptive hosts change the packet size with the rate.
            let frames = packet.len() / format.frame_bytes(speaker.channels());
            match SampleRate::from_frames_per_ms(frames) {
                Some(rate) if rate != format.rate => {
                    // The packet goes with the flushed buffer.
                    apply_request(
                        FormatRequest::SampleRate(rate.hz()),
                        speaker,
                        control,
                    );
                    Statistics::count(&stats.speaker_rejected);
                }
                _ => {
                    if speaker.process(packet, stats).is_err() {
                        Statistics::count(&stats.speaker_rejected);
                    }
                }
            }
        }
    }

    let mut sent = 0;
    if microphone.consume(|packet| {
        sent = packet.len();
        bridge.write_microphone(packet)
    }) {
        stats
            .bytes_to_host
            .fetch_add(sent as u32, portable_atomic::Ordering::Relaxed);
    }
}
