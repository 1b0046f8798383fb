//! Job application form access: gate, login redirect and form binding.

pub mod application;
pub mod config;
pub mod error;
pub mod telemetry;
