#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

//! Optical audio link
//!
//! Two boards face each other across a fiber or free space link. Each one
//! shows up on its host as a USB audio device with a stereo speaker and a
//! mono microphone. Audio played into the speaker is downmixed, encoded into
//! pulse positions and sent as light pulses. Pulses received from the other
//! board are decoded and recorded on the microphone.
//!
//! # Execution
//! * `TIMER_IRQ_1` (highest priority): one pulse per sample period.
//! * `USBCTRL_IRQ`: USB device, speaker packets in, microphone packets out.
//! * idle: microphone packet assembly from received codes.
//! * `telemetry`: statistics logged over RTT.
//! * core 1: pulse detection and decoding.
//!
//! # Telemetry
//! Statistics are logged as JSON every `telemetry_period` seconds. See
//! [laser_audio::telemetry::Telemetry].

#[cfg(target_os = "none")]
#[link_section = ".boot2"]
#[used]
pub static BOOT2_FIRMWARE: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[cfg(not(target_os = "none"))]
fn main() {
    let s = laser_audio::settings::Settings::default();
    println!(
        "{}",
        serde_json_core::to_string::<_, 512>(&s).unwrap().as_str()
    );
}

#[cfg(target_os = "none")]
#[cfg_attr(target_os = "none", rtic::app(device = laser_audio::hardware::hal::pac, peripherals = true, dispatchers=[PWM_IRQ_WRAP]))]
mod app {
    use laser_audio::{
        bridge,
        design_parameters::SPEAKER_PACKET_BYTES,
        format::FormatControl,
        hardware::{
            hal::pac::Interrupt,
            now_us,
            setup::{setup, LinkDevices},
            Microphone, MicrophoneReader, Mono, SampleTimer, Scheduler,
            Speaker, UsbAudioBridge,
        },
        settings::Settings,
        telemetry::{Statistics, Telemetry},
    };
    use rtic_monotonics::rp2040::prelude::*;

    static STATISTICS: Statistics = Statistics::new();
    static FORMAT: FormatControl = FormatControl::new(
        laser_audio::format::AudioFormat::new(
            laser_audio::design_parameters::DEFAULT_SAMPLE_RATE,
            ppm_codec::Resolution::Bits16,
        ),
    );

    #[shared]
    struct Shared {
        settings: Settings,
    }

    #[local]
    struct Local {
        scheduler: Scheduler,
        sample_timer: SampleTimer,
        speaker: Speaker,
        microphone: Microphone,
        microphone_reader: MicrophoneReader,
        usb: UsbAudioBridge,
    }

    #[init]
    fn init(c: init::Context) -> (Shared, Local) {
        let settings = Settings::default();
        let LinkDevices {
            speaker,
            scheduler,
            microphone,
            microphone_reader,
            usb,
            sample_timer,
        } = setup(c.device, &settings, &FORMAT, &STATISTICS);

        telemetry::spawn().unwrap();

        (
            Shared { settings },
            Local {
                scheduler,
                sample_timer,
                speaker,
                microphone,
                microphone_reader,
                usb,
            },
        )
    }

    /// One line symbol per sample period.
    #[task(binds = TIMER_IRQ_1, local = [scheduler, sample_timer], priority = 3)]
    fn tick(c: tick::Context) {
        c.local.sample_timer.clear();
        let delay = c.local.scheduler.tick(FORMAT.current().rate, &STATISTICS);
        if !c.local.sample_timer.schedule(delay) {
            log::trace!("Late sample tick");
        }
    }

    #[task(binds = USBCTRL_IRQ, local = [usb, speaker, microphone_reader, buf: [u8; SPEAKER_PACKET_BYTES] = [0; SPEAKER_PACKET_BYTES]], priority = 2)]
    fn usb(c: usb::Context) {
        c.local.usb.poll();
        bridge::service(
            c.local.usb,
            c.local.speaker,
            c.local.microphone_reader,
            &FORMAT,
            &STATISTICS,
            c.local.buf,
        );
    }

    #[idle(local = [microphone])]
    fn idle(c: idle::Context) -> ! {
        loop {
            if c.local.microphone.poll(now_us(), &FORMAT, &STATISTICS) {
                // Hand the packet or a pending discard to the USB task
                // without waiting for the next USB event.
                rtic::pend(Interrupt::USBCTRL_IRQ);
            }
        }
    }

    #[task(priority = 1, shared = [settings])]
    async fn telemetry(mut c: telemetry::Context) -> ! {
        loop {
            let period = c.shared.settings.lock(|s| s.telemetry_period);
            let tele: Telemetry = STATISTICS.take().finalize(period);
            match serde_json_core::to_string::<_, 512>(&tele) {
                Ok(json) => {
                    let json: heapless::String<512> = json;
                    log::info!("{}", json.as_str());
                }
                Err(e) => log::warn!("Telemetry serialization failed: {e:?}"),
            }
            // Schedule the telemetry task in the future.
            Mono::delay((period as u64).secs()).await;
        }
    }
}
