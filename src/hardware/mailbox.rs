use super::hal::sio::SioFifo;
use handoff::WordFifo;

/// One core's end of the SIO inter-core mailbox.
///
/// Each direction is eight words deep. Words written here are read on the
/// other core.
pub struct Mailbox(SioFifo);

impl Mailbox {
    pub fn new(fifo: SioFifo) -> Self {
        Self(fifo)
    }

    /// The mailbox of core 1.
    ///
    /// # Safety
    /// Must be called on core 1 and at most once. The SIO block is banked
    /// per core so this does not alias core 0's mailbox.
    pub unsafe fn core1() -> Self {
        let pac = super::hal::pac::Peripherals::steal();
        let sio = super::hal::Sio::new(pac.SIO);
        Self(sio.fifo)
    }
}

impl WordFifo for Mailbox {
    fn is_write_ready(&mut self) -> bool {
        self.0.is_write_ready()
    }

    fn write(&mut self, value: u32) {
        self.0.write(value)
    }

    fn read(&mut self) -> Option<u32> {
        self.0.read()
    }

    fn write_blocking(&mut self, value: u32) {
        self.0.write_blocking(value)
    }

    fn read_blocking(&mut self) -> u32 {
        self.0.read_blocking()
    }
}
