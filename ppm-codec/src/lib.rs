#![cfg_attr(not(test), no_std)]

//! Line codes for carrying one mono PCM channel over a single optical pulse train.
//!
//! # Design
//! Two mutually exclusive modulations share one interface:
//!
//! * Pulse-position modulation (PPM). Every audio sample becomes a 10 bit code
//!   ([encode]) which is sent as the low time of one pulse,
//!   `min_interval_cycles + code` ticks long ([Calibration::width_sent]). The
//!   receiver corrects the measured width for the detection latency and
//!   recovers the code ([Calibration::accept]).
//! * Pulse-density modulation (PDM). A second order delta-sigma modulator
//!   ([DeltaSigma]) turns every sample into one bit. 32 bits are packed
//!   LSB first into a line word that is shifted out serially.
//!
//! [Encoder] is the sample side (stateful for PDM), [LineCode] turns words
//! into what the pulse hardware consumes.

mod calibration;
pub use calibration::*;
mod encoder;
pub use encoder::*;
mod pdm;
pub use pdm::*;
mod ppm;
pub use ppm::*;
mod resolution;
pub use resolution::*;

pub use arbitrary_int::u10;
