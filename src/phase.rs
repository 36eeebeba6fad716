//! Per-phase winding resistance tests.
use core::fmt;

use crate::hardware::{Hardware, MotorControl};
use crate::modulation::{Phase, PhaseDuties};
use crate::sampler::Sampler;

/// Reported resistance when no usable current flowed
pub const RESISTANCE_FAILED: f32 = 0.0;
/// Ohms, inclusive
pub const MIN_PHASE_RESISTANCE: f32 = 0.01;
/// Ohms, inclusive
pub const MAX_PHASE_RESISTANCE: f32 = 100.0;

pub fn resistance_ok(ohms: f32) -> bool {
    (MIN_PHASE_RESISTANCE..=MAX_PHASE_RESISTANCE).contains(&ohms)
}

/// Outcome of driving one phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseReading {
    /// Ohms, not yet range checked
    Measured(f32),
    /// Current stayed under the detection floor, open circuit or no connection
    NoCurrent { amps: f32 },
}

impl PhaseReading {
    pub fn from_current(test_voltage: f32, amps: f32, min_current: f32) -> Self {
        // Written to also catch a NaN reading
        if !(amps >= min_current) {
            return PhaseReading::NoCurrent { amps };
        }
        PhaseReading::Measured(test_voltage / amps)
    }
    /// Ohms, or `RESISTANCE_FAILED`
    pub fn ohms(&self) -> f32 {
        match *self {
            PhaseReading::Measured(ohms) => ohms,
            PhaseReading::NoCurrent { .. } => RESISTANCE_FAILED,
        }
    }
    pub fn is_ok(&self) -> bool {
        match *self {
            PhaseReading::Measured(ohms) => resistance_ok(ohms),
            PhaseReading::NoCurrent { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseFault {
    ShortCircuit,
    OpenCircuit,
    NoConnection,
    Unknown,
}

impl PhaseFault {
    /// Only meaningful for a resistance that failed `resistance_ok`
    pub fn classify(ohms: f32) -> Self {
        // The sentinel is checked first, it is also below the short threshold
        if ohms == RESISTANCE_FAILED {
            PhaseFault::NoConnection
        } else if ohms < MIN_PHASE_RESISTANCE {
            PhaseFault::ShortCircuit
        } else if ohms > MAX_PHASE_RESISTANCE {
            PhaseFault::OpenCircuit
        } else {
            PhaseFault::Unknown
        }
    }
    pub fn description(self) -> &'static str {
        match self {
            PhaseFault::ShortCircuit => "Possible short circuit",
            PhaseFault::OpenCircuit => "Possible open circuit",
            PhaseFault::NoConnection => "No connection detected",
            PhaseFault::Unknown => "Unknown error",
        }
    }
}

impl fmt::Display for PhaseFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseStatus {
    pub phase_a_ok: bool,
    pub phase_b_ok: bool,
    pub phase_c_ok: bool,
    /// Ohms, `RESISTANCE_FAILED` when no current flowed
    pub phase_a_resistance: f32,
    pub phase_b_resistance: f32,
    pub phase_c_resistance: f32,
}

impl PhaseStatus {
    pub fn record(&mut self, phase: Phase, reading: PhaseReading) {
        let (ok, resistance) = match phase {
            Phase::A => (&mut self.phase_a_ok, &mut self.phase_a_resistance),
            Phase::B => (&mut self.phase_b_ok, &mut self.phase_b_resistance),
            Phase::C => (&mut self.phase_c_ok, &mut self.phase_c_resistance),
        };
        *ok = reading.is_ok();
        *resistance = reading.ohms();
    }
    pub fn ok(&self, phase: Phase) -> bool {
        match phase {
            Phase::A => self.phase_a_ok,
            Phase::B => self.phase_b_ok,
            Phase::C => self.phase_c_ok,
        }
    }
    pub fn resistance(&self, phase: Phase) -> f32 {
        match phase {
            Phase::A => self.phase_a_resistance,
            Phase::B => self.phase_b_resistance,
            Phase::C => self.phase_c_resistance,
        }
    }
    pub fn all_ok(&self) -> bool {
        Phase::ALL.iter().all(|&phase| self.ok(phase))
    }
}

/// Timing and averaging for one style of phase test
#[derive(Debug, Clone, Copy)]
pub struct PhaseTestProfile {
    /// Wait after disabling closed-loop control
    pub settle_ms: u32,
    /// Wait for the winding current to stabilise
    pub stabilize_ms: u32,
    pub samples: u32,
    /// Wait after releasing the outputs
    pub release_ms: u32,
}

impl PhaseTestProfile {
    pub const HEALTH_CHECK: PhaseTestProfile = PhaseTestProfile {
        settle_ms: 100,
        stabilize_ms: 50,
        samples: 10,
        release_ms: 50,
    };
    pub const CHARACTERIZATION: PhaseTestProfile = PhaseTestProfile {
        settle_ms: 500,
        stabilize_ms: 100,
        samples: 100,
        release_ms: 0,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct PhaseTestConfig {
    /// Volts applied to the leg under test
    pub test_voltage: f32,
    /// Amps, below this the winding counts as unconnected
    pub min_current: f32,
    pub health_check: PhaseTestProfile,
    pub characterization: PhaseTestProfile,
}

impl Default for PhaseTestConfig {
    fn default() -> Self {
        PhaseTestConfig {
            test_voltage: 0.5,
            min_current: 0.001,
            health_check: PhaseTestProfile::HEALTH_CHECK,
            characterization: PhaseTestProfile::CHARACTERIZATION,
        }
    }
}

/// Disable closed-loop control and measure a single phase
pub fn test_phase<B>(
    board: &mut B,
    sampler: &Sampler,
    config: &PhaseTestConfig,
    phase: Phase,
    profile: &PhaseTestProfile,
) -> PhaseReading
where
    B: Hardware + MotorControl,
{
    board.disable();
    board.delay_ms(profile.settle_ms);
    measure_phase(board, sampler, config, phase, profile)
}

/// Measure all three phases with the health check profile
pub fn check_phase_connections<B>(
    board: &mut B,
    sampler: &Sampler,
    config: &PhaseTestConfig,
) -> PhaseStatus
where
    B: Hardware + MotorControl,
{
    let profile = config.health_check;
    board.disable();
    board.delay_ms(profile.settle_ms);

    let mut status = PhaseStatus::default();
    for phase in Phase::ALL {
        let reading = measure_phase(board, sampler, config, phase, &profile);
        status.record(phase, reading);
    }
    status
}

fn measure_phase<H: Hardware>(
    hardware: &mut H,
    sampler: &Sampler,
    config: &PhaseTestConfig,
    phase: Phase,
    profile: &PhaseTestProfile,
) -> PhaseReading {
    hardware.set_pwm(PhaseDuties::single(phase) * config.test_voltage);
    hardware.delay_ms(profile.stabilize_ms);
    let amps = sampler.read_current_averaged(hardware, profile.samples);

    hardware.zero_outputs();
    hardware.delay_ms(profile.release_ms);

    let reading = PhaseReading::from_current(config.test_voltage, amps, config.min_current);
    match reading {
        PhaseReading::Measured(ohms) if resistance_ok(ohms) => {
            log::info!("Phase {}: {} Ohm", phase.name(), ohms)
        }
        PhaseReading::Measured(ohms) => log::warn!(
            "Phase {}: {} Ohm out of range, {}",
            phase.name(),
            ohms,
            PhaseFault::classify(ohms)
        ),
        PhaseReading::NoCurrent { amps } => {
            log::warn!("Phase {}: no current ({} A)", phase.name(), amps)
        }
    }
    reading
}
