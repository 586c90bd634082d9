#![cfg_attr(not(test), no_std)]

//! Producer/consumer handoff between execution contexts without locks on the
//! data path.
//!
//! # Design
//! [DoubleBuffer] is the ready-flag protocol: two slots, each with a payload,
//! a size and a `ready` flag. The producer owns a slot while `ready` is clear,
//! the consumer while it is set. Publishing writes the payload and size first
//! and then sets `ready` with `Release` ordering, observing uses `Acquire`.
//! The slot indices are private to the [Writer] and [Reader] handles, so
//! there is never a shared cursor to race on.
//!
//! Cross-core transport comes in two disciplines behind [Sender]/[Receiver]:
//! a word FIFO ([FifoSender], [FifoReceiver]) over any [WordFifo], and a
//! double ring of batches gated by two counting [Semaphore]s
//! ([SemaphoreRing]). Both drop the newest word when saturated and report it
//! as [Error::Full].

mod channel;
pub use channel::*;
mod double_buffer;
pub use double_buffer::*;
mod fifo;
pub use fifo::*;
mod ring;
pub use ring::*;
mod semaphore;
pub use semaphore::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The destination is still owned by the consumer (or being flushed).
    #[error("Destination busy")]
    Busy,
    /// No room left. The offered data was not accepted.
    #[error("Channel full")]
    Full,
}
