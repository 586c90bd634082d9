use ppm_codec::{interval_ticks, Calibration};

use crate::format::SampleRate;

/// Frequency of the crystal oscillator on the board.
pub const XTAL_FREQ_HZ: u32 = 12_000_000;

/// The system clock (and PIO clock, the state machines run undivided) in kHz.
///
/// The pulse width calibration below depends on it.
pub const SYS_CLOCK_KHZ: u32 = 250_000;

/// PIO cycles per counted pulse tick. Both the generator delay loop and the
/// detector counting loop take two instructions per tick.
pub const PIO_CYCLES_PER_TICK: u32 = 2;

/// Latency compensation of the detector in ticks.
// Empirical: 10 at 250 MHz, 5 at 133 MHz.
pub const MIN_TACKT: u32 = 10;

/// Low time of the shortest pulse (code 0) in nanoseconds.
pub const MIN_PULSE_PERIOD_NS: u32 = 3_000;

/// Pulse width of code 0 in ticks.
pub const MIN_INTERVAL_CYCLES: u32 =
    interval_ticks(SYS_CLOCK_KHZ, MIN_PULSE_PERIOD_NS, PIO_CYCLES_PER_TICK);

/// Shortest lead a timer alarm deadline needs to be armed reliably. The
/// alarm only fires on an exact match of the counter.
pub const MIN_ALARM_LEAD_US: u32 = 10;

/// Largest corrected pulse width accepted as a code.
pub const MAX_CODE: u32 = 1024;

/// The pulse width calibration of this board.
pub const CALIBRATION: Calibration =
    Calibration::new(MIN_TACKT, MIN_INTERVAL_CYCLES, MAX_CODE);

/// GPIO driving the optical transmitter (active low pulses).
pub const PULSE_GEN_PIN: u8 = 0;

/// GPIO receiving the optical detector output.
pub const PULSE_DET_PIN: u8 = 1;

/// Audio sample rate until the host selects one.
pub const DEFAULT_SAMPLE_RATE: SampleRate = SampleRate::Hz48000;

/// Channels in a host speaker frame. Stereo is downmixed to the mono link.
pub const SPEAKER_CHANNELS: usize = 2;

/// Channels in a host microphone frame.
pub const MICROPHONE_CHANNELS: usize = 1;

/// Most frames in one 1 ms USB packet: 48 kHz plus one frame of clock
/// slip.
pub const MAX_FRAMES_PER_PACKET: usize = 49;

/// Largest speaker packet in bytes (32 bit subslots).
pub const SPEAKER_PACKET_BYTES: usize =
    MAX_FRAMES_PER_PACKET * SPEAKER_CHANNELS * 4;

/// Largest microphone packet in bytes (32 bit subslots).
pub const MICROPHONE_PACKET_BYTES: usize =
    MAX_FRAMES_PER_PACKET * MICROPHONE_CHANNELS * 4;

/// Line words per transmit buffer slot. One speaker packet fills at most one slot.
pub const TX_BUFFER_WORDS: usize = MAX_FRAMES_PER_PACKET;

/// Words per batch of the semaphore ring between the cores.
pub const RX_BATCH: usize = 48;

/// Capacity of each semaphore ring buffer.
pub const RX_RING_CAPACITY: usize = 128;

/// Publish a partial receive batch this long after its first word.
pub const RX_FLUSH_TIMEOUT_US: u32 = 5_000;

/// Publish a partial microphone packet this long after the last sample.
pub const MIC_FLUSH_TIMEOUT_US: u32 = 1_000;

/// Interval between statistics reports.
pub const TELEMETRY_PERIOD_SECS: u32 = 15;
