//! Module for all hardware-specific setup of the link board
pub use rp2040_hal as hal;

mod mailbox;
pub mod metadata;
mod pulse;
mod sample_timer;
pub mod setup;
mod usb;

pub use mailbox::Mailbox;
pub use pulse::*;
pub use sample_timer::SampleTimer;
pub use usb::UsbAudioBridge;

use crate::design_parameters::TX_BUFFER_WORDS;

rtic_monotonics::rp2040_timer_monotonic!(Mono);

/// Free running microsecond counter (low word of the 64 bit timer).
///
/// The timer is shared with [Mono] which must have been started.
pub fn now_us() -> u32 {
    // Note(unsafe): Read-only access to the free running counter.
    let timer = unsafe { &*hal::pac::TIMER::ptr() };
    timer.timerawl().read().bits()
}

// Cross-core channel from the receive loop (core 1) to the microphone path.
#[cfg(not(feature = "semaphore-ring"))]
pub type LinkSender = handoff::FifoSender<Mailbox>;
#[cfg(not(feature = "semaphore-ring"))]
pub type LinkReceiver = handoff::FifoReceiver<Mailbox>;
#[cfg(feature = "semaphore-ring")]
pub type LinkSender = handoff::RingSender<'static, { crate::design_parameters::RX_RING_CAPACITY }>;
#[cfg(feature = "semaphore-ring")]
pub type LinkReceiver = handoff::RingReceiver<'static, { crate::design_parameters::RX_RING_CAPACITY }>;

// Line code and the state machine that puts it on the fiber.
#[cfg(not(feature = "pdm"))]
pub type LineEncoder = ppm_codec::PpmEncoder;
#[cfg(not(feature = "pdm"))]
pub type Line = ppm_codec::Calibration;
#[cfg(not(feature = "pdm"))]
pub type LineOutput = PulseGenerator<hal::pio::PIO1SM0>;
#[cfg(feature = "pdm")]
pub type LineEncoder = ppm_codec::PdmEncoder;
#[cfg(feature = "pdm")]
pub type Line = ppm_codec::PdmLine;
#[cfg(feature = "pdm")]
pub type LineOutput = PdmSerializer<hal::pio::PIO1SM0>;

pub type Detector = PulseDetector<hal::pio::PIO0SM0>;

pub type Speaker = crate::speaker::SpeakerPath<'static, LineEncoder, TX_BUFFER_WORDS>;
pub type Scheduler =
    crate::transmit::TransmitScheduler<'static, Line, LineOutput, TX_BUFFER_WORDS>;
pub type Microphone = crate::microphone::MicrophonePath<
    'static,
    LinkReceiver,
    { crate::design_parameters::MICROPHONE_PACKET_BYTES },
>;
pub type MicrophoneReader = handoff::Reader<
    'static,
    u8,
    { crate::design_parameters::MICROPHONE_PACKET_BYTES },
>;

#[inline(never)]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::{
        fmt::Write,
        sync::atomic::{AtomicBool, Ordering},
    };
    use cortex_m::asm;
    use rtt_target::{ChannelMode, UpChannel};

    cortex_m::interrupt::disable();

    // Recursion protection. Plain load/store, thumbv6m has no CAS.
    static PANICKED: AtomicBool = AtomicBool::new(false);
    while PANICKED.load(Ordering::Relaxed) {
        asm::bkpt();
    }
    PANICKED.store(true, Ordering::Relaxed);

    // Analogous to panic-rtt-target
    if let Some(mut channel) = unsafe { UpChannel::conjure(0) } {
        channel.set_mode(ChannelMode::BlockIfFull);
        writeln!(channel, "{}", info).ok();
    }

    // Abort
    asm::udf();
}

#[cortex_m_rt::exception]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[cortex_m_rt::exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("Unhandled exception (IRQn = {})", irqn);
}
