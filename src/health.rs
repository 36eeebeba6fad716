//! One-shot health report over all phases and hall lines.
use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::hall::{observe_halls, HallConfig, HallStatus};
use crate::hardware::{Hardware, MotorControl};
use crate::modulation::Phase;
use crate::phase::{check_phase_connections, PhaseFault, PhaseStatus, PhaseTestConfig};
use crate::sampler::Sampler;

pub const ALL_SYSTEMS_OPERATIONAL: &str = "All systems operational";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HallFault {
    Stuck,
    InvalidPattern,
}

impl HallFault {
    pub fn classify(changing: bool) -> Self {
        if changing {
            HallFault::InvalidPattern
        } else {
            HallFault::Stuck
        }
    }
}

impl fmt::Display for HallFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HallFault::Stuck => "No state changes detected - sensor may be stuck",
            HallFault::InvalidPattern => "Invalid signal pattern detected",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotorHealth {
    pub phases: PhaseStatus,
    pub halls: HallStatus,
    /// Inductance is not measured, always false
    pub inductance_ok: bool,
    /// No temperature sensing, always true
    pub temperature_ok: bool,
    pub error_message: String,
}

impl MotorHealth {
    /// Any phase or hall line failed
    pub fn has_faults(&self) -> bool {
        !self.phases.all_ok() || !self.halls.all_ok()
    }
}

/// A sentence per failing phase and hall line, or the all-clear
pub fn compose_error_message(phases: &PhaseStatus, halls: &HallStatus) -> String {
    let mut message = String::new();
    for phase in Phase::ALL {
        if !phases.ok(phase) {
            let fault = PhaseFault::classify(phases.resistance(phase));
            message.push_str(&format!("Phase {}: {}. ", phase.name(), fault));
        }
    }
    let lines = [
        ("A", halls.hall_a_ok, halls.hall_a_changing),
        ("B", halls.hall_b_ok, halls.hall_b_changing),
        ("C", halls.hall_c_ok, halls.hall_c_changing),
    ];
    for (name, ok, changing) in lines {
        if !ok {
            message.push_str(&format!("Hall {}: {}. ", name, HallFault::classify(changing)));
        }
    }
    if message.is_empty() {
        message.push_str(ALL_SYSTEMS_OPERATIONAL);
    }
    message
}

/// Leaves closed-loop control disabled
pub fn check_motor_health<B>(
    board: &mut B,
    sampler: &Sampler,
    phase_config: &PhaseTestConfig,
    hall_config: &HallConfig,
) -> MotorHealth
where
    B: Hardware + MotorControl,
{
    log::info!("Checking motor health");
    let phases = check_phase_connections(board, sampler, phase_config);
    let halls = observe_halls(board, hall_config, hall_config.observe_window_ms);

    let health = MotorHealth {
        phases,
        halls,
        inductance_ok: false,
        temperature_ok: true,
        error_message: compose_error_message(&phases, &halls),
    };
    if health.has_faults() {
        log::warn!("Motor health: {}", health.error_message);
    } else {
        log::info!("Motor health: {}", health.error_message);
    }
    health
}
