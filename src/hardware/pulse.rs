//! PIO pulse generator and detector
//!
//! # Design
//! Both state machines count pulse widths in loops of two instructions so
//! that one tick is two PIO cycles ([crate::design_parameters::PIO_CYCLES_PER_TICK])
//! on both ends. The state machines run at the system clock.
//!
//! The generator idles high. For every width popped from its FIFO it drives
//! the pin low for that many ticks and releases it. Widths are consumed
//! back to back so the next pulse starts as soon as the previous one ended
//! and a new width is queued.
//!
//! The detector waits for a falling edge and counts ticks until the pin is
//! high again. The count is pushed without blocking: with the RX FIFO
//! joined there is room for eight measurements, anything beyond is lost.
use super::hal::pio::{
    Buffers, PIOBuilder, PinDir, Running, Rx, ShiftDirection, StateMachine,
    Tx, UninitStateMachine, ValidStateMachine, PIO,
};

use crate::{format::SampleRate, transmit::PulseSink};

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("PIO instruction memory exhausted")]
    ProgramSpace,
}

/// Emits one low pulse per queued width.
pub struct PulseGenerator<SM: ValidStateMachine> {
    _sm: StateMachine<SM, Running>,
    tx: Tx<SM>,
}

impl<SM: ValidStateMachine> PulseGenerator<SM> {
    /// Load and start the generator program.
    ///
    /// # Args
    /// * `pio` - The PIO block owning `sm`.
    /// * `sm` - The state machine to use.
    /// * `pin` - Output GPIO, already in the PIO function.
    pub fn new(
        pio: &mut PIO<SM::PIO>,
        sm: UninitStateMachine<SM>,
        pin: u8,
    ) -> Result<Self, SetupError> {
        let program = pio::pio_asm!(
            "
                set pins, 1
            .wrap_target
                pull block
                out x, 32
                set pins, 0
            low:
                jmp x-- low [1]
                set pins, 1
            .wrap
            "
        );
        let installed = pio
            .install(&program.program)
            .map_err(|_| SetupError::ProgramSpace)?;
        let (mut sm, _, tx) = PIOBuilder::from_installed_program(installed)
            .set_pins(pin, 1)
            .buffers(Buffers::OnlyTx)
            .clock_divisor_fixed_point(1, 0)
            .build(sm);
        sm.set_pindirs([(pin, PinDir::Output)]);
        Ok(Self {
            _sm: sm.start(),
            tx,
        })
    }
}

impl<SM: ValidStateMachine> PulseSink for PulseGenerator<SM> {
    fn try_emit(&mut self, width: u32) -> bool {
        self.tx.write(width)
    }
}

/// Measures the low time of incoming pulses.
pub struct PulseDetector<SM: ValidStateMachine> {
    _sm: StateMachine<SM, Running>,
    rx: Rx<SM>,
}

impl<SM: ValidStateMachine> PulseDetector<SM> {
    /// Load and start the detector program.
    ///
    /// # Args
    /// * `pio` - The PIO block owning `sm`.
    /// * `sm` - The state machine to use.
    /// * `pin` - Input GPIO.
    pub fn new(
        pio: &mut PIO<SM::PIO>,
        sm: UninitStateMachine<SM>,
        pin: u8,
    ) -> Result<Self, SetupError> {
        let program = pio::pio_asm!(
            "
            .wrap_target
                wait 1 pin 0
                wait 0 pin 0
                mov x, ~null
            count:
                jmp pin done
                jmp x-- count
            done:
                mov isr, ~x
                push noblock
            .wrap
            "
        );
        let installed = pio
            .install(&program.program)
            .map_err(|_| SetupError::ProgramSpace)?;
        let (mut sm, rx, _) = PIOBuilder::from_installed_program(installed)
            .in_pin_base(pin)
            .jmp_pin(pin)
            .buffers(Buffers::OnlyRx)
            .clock_divisor_fixed_point(1, 0)
            .build(sm);
        sm.set_pindirs([(pin, PinDir::Input)]);
        Ok(Self {
            _sm: sm.start(),
            rx,
        })
    }
}

impl<SM: ValidStateMachine> crate::receive::PulseSource for PulseDetector<SM> {
    fn poll_width(&mut self) -> Option<u32> {
        self.rx.read()
    }
}

/// Shifts out pulse-density words one bit per sample, LSB first.
pub struct PdmSerializer<SM: ValidStateMachine> {
    sm: StateMachine<SM, Running>,
    tx: Tx<SM>,
    sys_clock_hz: u32,
}

impl<SM: ValidStateMachine> PdmSerializer<SM> {
    /// Load and start the serializer program.
    ///
    /// # Args
    /// * `pio` - The PIO block owning `sm`.
    /// * `sm` - The state machine to use.
    /// * `pin` - Output GPIO, already in the PIO function.
    /// * `sys_clock_hz` - PIO input clock.
    /// * `rate` - Initial bit rate.
    pub fn new(
        pio: &mut PIO<SM::PIO>,
        sm: UninitStateMachine<SM>,
        pin: u8,
        sys_clock_hz: u32,
        rate: SampleRate,
    ) -> Result<Self, SetupError> {
        let program = pio::pio_asm!(
            "
            .wrap_target
                out pins, 1
            .wrap
            "
        );
        let installed = pio
            .install(&program.program)
            .map_err(|_| SetupError::ProgramSpace)?;
        let (int, frac) = Self::divisor(sys_clock_hz, rate);
        let (mut sm, _, tx) = PIOBuilder::from_installed_program(installed)
            .out_pins(pin, 1)
            .buffers(Buffers::OnlyTx)
            .autopull(true)
            .pull_threshold(32)
            .out_shift_direction(ShiftDirection::Right)
            .clock_divisor_fixed_point(int, frac)
            .build(sm);
        sm.set_pindirs([(pin, PinDir::Output)]);
        Ok(Self {
            sm: sm.start(),
            tx,
            sys_clock_hz,
        })
    }

    /// 16.8 fixed point clock divisor for one bit per sample.
    fn divisor(sys_clock_hz: u32, rate: SampleRate) -> (u16, u8) {
        let div = ((sys_clock_hz as u64) << 8) / rate.hz() as u64;
        ((div >> 8) as u16, div as u8)
    }
}

impl<SM: ValidStateMachine> PulseSink for PdmSerializer<SM> {
    fn try_emit(&mut self, word: u32) -> bool {
        self.tx.write(word)
    }

    fn set_rate(&mut self, rate: SampleRate) {
        let (int, frac) = Self::divisor(self.sys_clock_hz, rate);
        self.sm.clock_divisor_fixed_point(int, frac);
    }
}
