use usb_device::{class_prelude::UsbBusAllocator, prelude::*};
use usbd_audio::{AudioClass, AudioClassBuilder, Format, StreamConfig, TerminalType};

use super::hal::usb::UsbBus;
use crate::{bridge::AudioBridge, format::FormatRequest};

/// USB audio class device: one stereo speaker stream in, one mono
/// microphone stream out.
pub struct UsbAudioBridge {
    device: UsbDevice<'static, UsbBus>,
    audio: AudioClass<'static, UsbBus>,
    speaker_alt: u8,
    microphone_alt: u8,
    request: Option<FormatRequest>,
}

impl UsbAudioBridge {
    /// # Args
    /// * `bus` - The USB bus.
    /// * `rates` - Offered sample rates in Hz.
    pub fn new(bus: &'static UsbBusAllocator<UsbBus>, rates: &'static [u32]) -> Self {
        let audio = AudioClassBuilder::new()
            .input(
                StreamConfig::new_discrete(
                    Format::S16le,
                    1,
                    rates,
                    TerminalType::InMicrophone,
                )
                .unwrap(),
            )
            .output(
                StreamConfig::new_discrete(
                    Format::S16le,
                    2,
                    rates,
                    TerminalType::OutSpeaker,
                )
                .unwrap(),
            )
            .build(bus)
            .unwrap();

        let device = UsbDeviceBuilder::new(bus, UsbVidPid(0x1209, 0x0001))
            .strings(&[StringDescriptors::new(LangID::EN_US)
                .manufacturer("QUARTIQ")
                .product("Laser Audio Link")
                .serial_number("0")])
            .unwrap()
            .max_packet_size_0(64)
            .unwrap()
            .build();

        Self {
            device,
            audio,
            speaker_alt: 0,
            microphone_alt: 0,
            request: None,
        }
    }

    /// Service the USB device.
    ///
    /// Starting either stream (alternate setting 1) turns into a
    /// [FormatRequest::Restart].
    pub fn poll(&mut self) -> bool {
        let active = self.device.poll(&mut [&mut self.audio]);
        let speaker_alt = self.audio.output_alt_setting().unwrap_or(0);
        let microphone_alt = self.audio.input_alt_setting().unwrap_or(0);
        if (speaker_alt, microphone_alt) != (self.speaker_alt, self.microphone_alt) {
            log::info!("Alt settings: speaker {speaker_alt} microphone {microphone_alt}");
            if speaker_alt > self.speaker_alt || microphone_alt > self.microphone_alt {
                self.request = Some(FormatRequest::Restart);
            }
            self.speaker_alt = speaker_alt;
            self.microphone_alt = microphone_alt;
        }
        active
    }
}

impl AudioBridge for UsbAudioBridge {
    fn read_speaker(&mut self, buf: &mut [u8]) -> Option<usize> {
        self.audio.read(buf).ok().filter(|&len| len > 0)
    }

    fn write_microphone(&mut self, packet: &[u8]) -> bool {
        self.microphone_alt != 0 && self.audio.write(packet).is_ok()
    }

    fn poll_request(&mut self) -> Option<FormatRequest> {
        self.request.take()
    }
}
