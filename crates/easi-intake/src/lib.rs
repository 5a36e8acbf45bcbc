//! System intake lifecycle service: validation, state transitions, and the HTTP boundary for
//! governance requests submitted through EASi.

pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
