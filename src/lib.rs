#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod diagnostics;
pub mod hall;
pub mod hardware;
pub mod health;
pub mod modulation;
pub mod open_loop;
pub mod phase;
pub mod pole_pairs;
pub mod sampler;
pub mod supervisor;
mod util;

#[cfg(test)]
mod sim;

pub use diagnostics::{
    calculate_motor_kv, Diagnostics, DiagnosticsConfig, MotorParameters, MotorSettings,
};
pub use hall::HallStatus;
pub use health::MotorHealth;
pub use open_loop::OpenLoopTestResult;
pub use phase::{PhaseStatus, RESISTANCE_FAILED};
