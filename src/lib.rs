#![cfg_attr(target_os = "none", no_std)]

//! Optical PPM audio link between two RP2040 boards bridged to USB audio.
//!
//! # Design
//! Core 0 runs the host side: the USB task ([bridge::service]) feeds the
//! [speaker::SpeakerPath] which encodes into the transmit double buffer, the
//! sample tick interrupt drains it through the [transmit::TransmitScheduler]
//! into the pulse generator, and the idle loop assembles microphone packets
//! in the [microphone::MicrophonePath]. Core 1 runs the
//! [receive::ReceiveLoop] on the pulse detector and forwards codes across
//! the cores.
//!
//! Everything except [hardware] is target independent and tested on the
//! host.

pub mod bridge;
pub mod design_parameters;
pub mod format;
pub mod microphone;
pub mod receive;
pub mod settings;
pub mod speaker;
pub mod telemetry;
pub mod transmit;

#[cfg(target_os = "none")]
pub mod hardware;
