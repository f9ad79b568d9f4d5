//! maskwatch library: controller for a proximity-triggered health-check kiosk.
//!
//! Two ultrasonic probes decide what the kiosk does on each pass. A visitor
//! close to the thermometer gets a temperature reading; a visitor in front
//! of the camera gets a mask classification. Readings go to a collector over
//! a length-prefixed TCP protocol, and the collector answers each poll with
//! a user record the kiosk appends to a local CSV log.
//!
//! The library is organized in three layers:
//! - **Wire**: `frame`, `protocol`, `link`: framing, typed messages and the
//!   crash-only connection supervisor.
//! - **Control**: `kiosk`, `runner`, `classify`, `config`, `error`: the trigger
//!   cycle and the single fault path that ends every failure in a restart.
//! - **Collaborators**: `peripherals` traits with reference drivers in
//!   `ultrasonic`, `thermal`, `vision`, `userlog`; `collector` is the other
//!   end of the link; `board` holds pin maps.
//!
//! Everything here builds and tests on the host. The ESP32 binary in
//! `firmware-std/` only wires hardware handles into these types.

pub mod board;
pub mod classify;
pub mod collector;
pub mod config;
pub mod error;
pub mod frame;
pub mod kiosk;
pub mod link;
pub mod peripherals;
pub mod protocol;
pub mod runner;
pub mod thermal;
pub mod ultrasonic;
pub mod userlog;
pub mod vision;

#[cfg(test)]
pub(crate) mod testing;
