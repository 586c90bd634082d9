use crate::Error;

/// Producing end of a cross-core channel of code words.
pub trait Sender {
    /// Offer one word without blocking.
    ///
    /// # Returns
    /// [Error::Full] if the channel is saturated. The word is dropped.
    fn try_send(&mut self, word: u32) -> Result<(), Error>;

    /// Housekeeping on every pass of the producing loop, e.g. publishing a
    /// partial batch after a timeout.
    ///
    /// # Args
    /// * `now_us` - Free running microsecond timestamp.
    fn flush(&mut self, _now_us: u32) {}
}

/// Consuming end of a cross-core channel of code words.
pub trait Receiver {
    /// Take one word if available, without blocking.
    fn try_recv(&mut self) -> Option<u32>;
}
