//! Futaba — two-channel Modbus RTU digital output slave
//!
//! This crate provides the core library for Futaba: a slave device that
//! exposes two 16-bit holding registers over a Modbus RTU serial link and
//! mirrors them onto two digital output lines once per control-loop tick
//! (non-zero asserts, zero deasserts). Protocol framing, CRC and exception
//! handling are delegated to `rmodbus`; the serial transport is
//! `serialport`.
//!
//! The public module re-exports the main API (builder, device handle,
//! events, output backends). The internal runtime/boot helpers are placed
//! in hidden modules to keep implementation details out of the generated
//! documentation.

pub mod api;
#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
pub mod config;
#[doc(hidden)]
pub mod core;
#[doc(hidden)]
pub mod driver;
#[doc(hidden)]
pub mod protocol;
#[doc(hidden)]
pub mod utils;

pub use api::*;
