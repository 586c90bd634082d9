//! Link board hardware configuration
//!
//! This file contains all of the hardware-specific configuration of the
//! board: clocks, logging, the PIO pulse programs, USB and the second core.
use fugit::RateExtU32;
use handoff::DoubleBuffer;
use ppm_codec::LineCode;

use super::{
    hal::{
        self,
        clocks::ClocksManager,
        gpio::{FunctionPio0, FunctionPio1},
        multicore::{Multicore, Stack},
        pac,
        pio::PIOExt,
        pll::{common_configs::PLL_USB_48MHZ, setup_pll_blocking, PLLConfig},
        usb::UsbBus,
        watchdog::Watchdog,
        xosc::setup_xosc_blocking,
        Sio,
    },
    metadata::ApplicationMetadata,
    now_us, LinkReceiver, LinkSender, Microphone, MicrophoneReader, Mono,
    PulseDetector, SampleTimer, Scheduler, Speaker, UsbAudioBridge,
};
use crate::{
    design_parameters::{self as dp, MICROPHONE_PACKET_BYTES, TX_BUFFER_WORDS},
    format::FormatControl,
    microphone::MicrophonePath,
    receive::ReceiveLoop,
    settings::Settings,
    speaker::SpeakerPath,
    telemetry::Statistics,
    transmit::{PulseSink, TransmitScheduler},
};

/// Stack of the receive loop on core 1.
static CORE1_STACK: Stack<4096> = Stack::new();

/// Sample rates offered to the host.
static SAMPLE_RATES: [u32; 2] = [44_100, 48_000];

/// The devices used by the core 0 tasks.
pub struct LinkDevices {
    pub speaker: Speaker,
    pub scheduler: Scheduler,
    pub microphone: Microphone,
    pub microphone_reader: MicrophoneReader,
    pub usb: UsbAudioBridge,
    pub sample_timer: SampleTimer,
}

/// Configure the board and start the receive loop on core 1.
///
/// # Note
/// Interrupts must be disabled when this is called.
///
/// # Args
/// * `device` - The device peripherals.
/// * `settings` - Calibration, initial format and timeouts.
/// * `format` - The shared stream format.
/// * `stats` - Statistics updated by both cores.
///
/// # Returns
/// The core 0 side of the link, ready to be driven by its tasks.
pub fn setup(
    mut device: pac::Peripherals,
    settings: &Settings,
    format: &'static FormatControl,
    stats: &'static Statistics,
) -> LinkDevices {
    // Soft reset does not release the hardware spinlocks.
    // Note(unsafe): The other core is not running yet.
    unsafe { hal::sio::spinlock_reset() };

    // Set up RTT logging
    {
        let channels = rtt_target::rtt_init_default!();
        // Note(unsafe): The closure establishes a critical section across
        // both cores (SIO spinlock with interrupts masked).
        unsafe {
            rtt_target::set_print_channel_cs(
                channels.up.0,
                &((|arg, f| critical_section::with(|_| f(arg)))
                    as rtt_target::CriticalSectionFunc),
            );
        }

        static LOGGER: rtt_logger::RTTLogger =
            rtt_logger::RTTLogger::new(log::LevelFilter::Info);
        // Note(unsafe): thumbv6m has no atomic compare-and-swap. Nothing else
        // runs yet.
        unsafe {
            log::set_logger_racy(&LOGGER)
                .map(|()| log::set_max_level_racy(log::LevelFilter::Trace))
                .unwrap();
        }
        log::info!("Starting");
    }

    // The watchdog tick also clocks the microsecond timer.
    let mut watchdog = Watchdog::new(device.WATCHDOG);
    watchdog.enable_tick_generation((dp::XTAL_FREQ_HZ / 1_000_000) as u8);

    let xosc = setup_xosc_blocking(device.XOSC, dp::XTAL_FREQ_HZ.Hz())
        .ok()
        .unwrap();
    let mut clocks = ClocksManager::new(device.CLOCKS);
    // 12 MHz * 125 / 3 / 2 = 250 MHz
    let pll_sys = setup_pll_blocking(
        device.PLL_SYS,
        xosc.operating_frequency(),
        PLLConfig {
            vco_freq: 1500.MHz(),
            refdiv: 1,
            post_div1: 3,
            post_div2: 2,
        },
        &mut clocks,
        &mut device.RESETS,
    )
    .ok()
    .unwrap();
    let pll_usb = setup_pll_blocking(
        device.PLL_USB,
        xosc.operating_frequency(),
        PLL_USB_48MHZ,
        &mut clocks,
        &mut device.RESETS,
    )
    .ok()
    .unwrap();
    clocks.init_default(&xosc, &pll_sys, &pll_usb).ok().unwrap();
    let metadata = ApplicationMetadata::new();
    match serde_json_core::to_string::<_, 256>(metadata) {
        Ok(json) => log::info!("{}", json.as_str()),
        Err(e) => log::warn!("Metadata serialization failed: {e:?}"),
    }

    Mono::start(device.TIMER, &device.RESETS);

    format.commit(settings.format);

    let mut sio = Sio::new(device.SIO);
    let pins = hal::gpio::Pins::new(
        device.IO_BANK0,
        device.PADS_BANK0,
        sio.gpio_bank0,
        &mut device.RESETS,
    );
    let generator_pin = pins.gpio0.into_function::<FunctionPio1>();
    assert_eq!(generator_pin.id().num, dp::PULSE_GEN_PIN);
    let detector_pin = pins.gpio1.into_function::<FunctionPio0>();
    assert_eq!(detector_pin.id().num, dp::PULSE_DET_PIN);

    let (mut pio0, detector_sm, _, _, _) = device.PIO0.split(&mut device.RESETS);
    let (mut pio1, generator_sm, _, _, _) = device.PIO1.split(&mut device.RESETS);

    let detector =
        PulseDetector::new(&mut pio0, detector_sm, dp::PULSE_DET_PIN).unwrap();

    #[cfg(not(feature = "pdm"))]
    let (line, mut output) = (
        settings.calibration,
        super::PulseGenerator::new(&mut pio1, generator_sm, dp::PULSE_GEN_PIN)
            .unwrap(),
    );
    #[cfg(feature = "pdm")]
    let (line, mut output) = (
        ppm_codec::PdmLine,
        super::PdmSerializer::new(
            &mut pio1,
            generator_sm,
            dp::PULSE_GEN_PIN,
            dp::SYS_CLOCK_KHZ * 1_000,
            settings.format.rate,
        )
        .unwrap(),
    );

    // The tick is not running yet, the line starts idle.
    output.emit(line.idle());

    // Cross-core channel
    #[cfg(feature = "semaphore-ring")]
    let (link_sender, link_receiver): (LinkSender, LinkReceiver) = {
        let ring = cortex_m::singleton!(
            : handoff::SemaphoreRing<{ dp::RX_RING_CAPACITY }> = handoff::SemaphoreRing::new()
        )
        .unwrap();
        ring.split(settings.rx_batch, settings.rx_flush_timeout)
    };

    // Start the receive loop.
    {
        let mut mc = Multicore::new(&mut device.PSM, &mut device.PPB, &mut sio.fifo);
        let cores = mc.cores();
        let calibration = settings.calibration;
        #[cfg(feature = "semaphore-ring")]
        let sender = link_sender;
        cores[1]
            .spawn(CORE1_STACK.take().unwrap(), move || {
                #[cfg(not(feature = "semaphore-ring"))]
                // Note(unsafe): This is core 1 and the only instance.
                let sender: LinkSender =
                    handoff::FifoSender::new(unsafe { super::Mailbox::core1() });
                log::info!("Receive loop running");
                ReceiveLoop::new(detector, sender, calibration).run(now_us, stats)
            })
            .unwrap();
    }

    #[cfg(not(feature = "semaphore-ring"))]
    let link_receiver: LinkReceiver =
        handoff::FifoReceiver::new(super::Mailbox::new(sio.fifo));

    let (tx_writer, tx_reader) = cortex_m::singleton!(
        : DoubleBuffer<u32, TX_BUFFER_WORDS> = DoubleBuffer::new(0)
    )
    .unwrap()
    .split();
    let (microphone_writer, microphone_reader) = cortex_m::singleton!(
        : DoubleBuffer<u8, MICROPHONE_PACKET_BYTES> = DoubleBuffer::new(0)
    )
    .unwrap()
    .split();

    let speaker = SpeakerPath::new(
        Default::default(),
        tx_writer,
        settings.format,
        dp::SPEAKER_CHANNELS,
    );
    let scheduler =
        TransmitScheduler::new(line, output, tx_reader, settings.format.rate);
    let microphone = MicrophonePath::new(
        link_receiver,
        microphone_writer,
        format,
        dp::MICROPHONE_CHANNELS,
        settings.mic_flush_timeout,
    );

    let usb_bus = cortex_m::singleton!(
        : usb_device::class_prelude::UsbBusAllocator<UsbBus> =
            usb_device::class_prelude::UsbBusAllocator::new(UsbBus::new(
                device.USBCTRL_REGS,
                device.USBCTRL_DPRAM,
                clocks.usb_clock,
                true,
                &mut device.RESETS,
            ))
    )
    .unwrap();
    let usb = UsbAudioBridge::new(usb_bus, &SAMPLE_RATES);

    let sample_timer = SampleTimer::start(1_000);

    log::info!("setup() complete");

    LinkDevices {
        speaker,
        scheduler,
        microphone,
        microphone_reader,
        usb,
        sample_timer,
    }
}
