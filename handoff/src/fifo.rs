use crate::{Error, Receiver, Sender};

/// A hardware word queue between two cores, e.g. the RP2040 SIO mailbox.
///
/// Each core has its own handle: words written on one core are read on the
/// other.
pub trait WordFifo {
    /// Whether there is room for another word.
    fn is_write_ready(&mut self) -> bool;

    /// Write a word. The caller has checked [Self::is_write_ready].
    fn write(&mut self, value: u32);

    /// Read a word if one is available.
    fn read(&mut self) -> Option<u32>;

    fn write_blocking(&mut self, value: u32) {
        while !self.is_write_ready() {
            core::hint::spin_loop();
        }
        self.write(value);
    }

    fn read_blocking(&mut self) -> u32 {
        loop {
            if let Some(value) = self.read() {
                return value;
            }
            core::hint::spin_loop();
        }
    }
}

/// Sending end of the single word FIFO discipline.
pub struct FifoSender<F> {
    fifo: F,
}

impl<F: WordFifo> FifoSender<F> {
    pub fn new(fifo: F) -> Self {
        Self { fifo }
    }

    /// Push a word, waiting for room.
    pub fn send_blocking(&mut self, word: u32) {
        self.fifo.write_blocking(word)
    }
}

impl<F: WordFifo> Sender for FifoSender<F> {
    fn try_send(&mut self, word: u32) -> Result<(), Error> {
        if self.fifo.is_write_ready() {
            self.fifo.write(word);
            Ok(())
        } else {
            Err(Error::Full)
        }
    }
}

/// Receiving end of the single word FIFO discipline.
pub struct FifoReceiver<F> {
    fifo: F,
}

impl<F: WordFifo> FifoReceiver<F> {
    pub fn new(fifo: F) -> Self {
        Self { fifo }
    }

    /// Pop a word, waiting for one to arrive.
    pub fn recv_blocking(&mut self) -> u32 {
        self.fifo.read_blocking()
    }
}

impl<F: WordFifo> Receiver for FifoReceiver<F> {
    fn try_recv(&mut self) -> Option<u32> {
        self.fifo.read()
    }
}
