//! The diagnostic engine: owns the board and runs every test against it.
use crate::hall::{self, HallConfig};
use crate::hardware::{Direction, Hardware, MotorControl};
use crate::health::{self, MotorHealth};
use crate::modulation::Phase;
use crate::open_loop::{self, OpenLoopConfig, OpenLoopTestResult};
use crate::phase::{self, PhaseReading, PhaseTestConfig, PhaseTestProfile};
use crate::pole_pairs::{self, PolePairConfig};
use crate::sampler::{Sampler, SamplerConfig};

/// Henries, placeholder until a step-response measurement exists
pub const STUB_PHASE_INDUCTANCE: f32 = 0.001;

/// Last full characterisation of the attached motor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorParameters {
    /// Ohms
    pub phase_resistance: f32,
    /// Henries
    pub phase_inductance: f32,
    pub pole_pairs: u32,
    pub hall_valid: bool,
    /// Bus volts
    pub input_voltage: f32,
    /// RPM per volt
    pub motor_kv: f32,
}

/// Settings the transport layer reads back and writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorSettings {
    /// Volts
    pub voltage_limit: f32,
    pub direction: Direction,
}

pub fn measure_phase_inductance() -> f32 {
    STUB_PHASE_INDUCTANCE
}

/// RPM per volt, zero for a non-positive voltage
pub fn calculate_motor_kv(voltage: f32, rpm: f32) -> f32 {
    if voltage <= 0. {
        return 0.;
    }
    rpm / voltage
}

#[derive(Debug)]
pub struct Diagnostics<B> {
    board: B,
    sampler: Sampler,
    config: DiagnosticsConfig,
    parameters: MotorParameters,
}

impl<B> Diagnostics<B>
where
    B: Hardware + MotorControl,
{
    /// Runs every phase and hall check. Closed-loop control is left disabled,
    /// see `reinitialize_control`.
    pub fn check_motor_health(&mut self) -> MotorHealth {
        health::check_motor_health(
            &mut self.board,
            &self.sampler,
            &self.config.phase,
            &self.config.hall,
        )
    }

    /// Full characterisation, updating `parameters` in place. False when the
    /// phase resistance is out of range, in which case only the resistance
    /// is updated.
    pub fn measure_motor_parameters(&mut self) -> bool {
        log::info!("Measuring motor parameters");
        let reading = self.test_phase(Phase::A, self.config.phase.characterization);
        self.parameters.phase_resistance = reading.ohms();
        if !reading.is_ok() {
            log::error!(
                "Phase resistance {} Ohm out of range, aborting characterisation",
                reading.ohms()
            );
            return false;
        }

        self.parameters.phase_inductance = measure_phase_inductance();
        self.parameters.pole_pairs = self.detect_pole_pairs();
        self.parameters.hall_valid = self.verify_hall_sensors();
        self.parameters.input_voltage = self.measure_input_voltage();

        self.board.set_voltage_limit(self.parameters.input_voltage);
        log::info!("Motor parameters: {:?}", self.parameters);
        true
    }

    /// Characterisation-profile resistance of phase A, ohms or the sentinel
    pub fn measure_phase_resistance(&mut self) -> f32 {
        self.test_phase(Phase::A, self.config.phase.characterization)
            .ohms()
    }

    pub fn test_phase(&mut self, phase: Phase, profile: PhaseTestProfile) -> PhaseReading {
        phase::test_phase(
            &mut self.board,
            &self.sampler,
            &self.config.phase,
            phase,
            &profile,
        )
    }

    pub fn run_open_loop_test(&mut self, duty_cycle: f32, duration_ms: u32) -> OpenLoopTestResult {
        open_loop::run_open_loop_test(
            &mut self.board,
            &self.sampler,
            &self.config.open_loop,
            duty_cycle,
            duration_ms,
        )
    }

    pub fn detect_pole_pairs(&mut self) -> u32 {
        pole_pairs::detect_pole_pairs(&mut self.board, &self.config.pole_pairs)
    }

    pub fn verify_hall_sensors(&mut self) -> bool {
        hall::verify_hall_sensors(&mut self.board, &self.config.hall)
    }

    /// Amps
    pub fn get_current_reading(&mut self) -> f32 {
        self.sampler.read_current(&mut self.board)
    }

    /// Bus volts
    pub fn measure_input_voltage(&mut self) -> f32 {
        self.sampler.read_bus_voltage(&mut self.board)
    }

    /// Kv against the last measured input voltage
    pub fn record_motor_kv(&mut self, rpm: f32) -> f32 {
        self.parameters.motor_kv = calculate_motor_kv(self.parameters.input_voltage, rpm);
        self.parameters.motor_kv
    }

    /// Hand the motor back to the closed-loop controller
    pub fn reinitialize_control(&mut self) {
        log::info!("Reinitialising closed-loop control");
        self.board.init_foc();
    }

    pub fn settings(&self) -> MotorSettings {
        MotorSettings {
            voltage_limit: self.board.voltage_limit(),
            direction: self.board.sensor_direction(),
        }
    }

    pub fn set_voltage_limit(&mut self, volts: f32) {
        log::info!("Voltage limit set to {} V", volts);
        self.board.set_voltage_limit(volts);
    }

    pub fn set_direction(&mut self, direction: Direction) {
        log::info!("Sensor direction set to {:?}", direction);
        self.board.set_sensor_direction(direction);
    }

    pub fn now_ms(&self) -> u32 {
        self.board.now_ms()
    }
}

impl<B> Diagnostics<B> {
    pub fn parameters(&self) -> MotorParameters {
        self.parameters
    }
    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }
    pub fn board(&self) -> &B {
        &self.board
    }
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }
    pub fn into_board(self) -> B {
        self.board
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticsConfig {
    sampler: SamplerConfig,
    phase: PhaseTestConfig,
    hall: HallConfig,
    pole_pairs: PolePairConfig,
    open_loop: OpenLoopConfig,
}

impl DiagnosticsConfig {
    pub fn new() -> Self {
        DiagnosticsConfig::default()
    }
    /// Realize a `Diagnostics` engine driving `board`
    pub fn realize<B>(&self, board: B) -> Diagnostics<B> {
        Diagnostics {
            board,
            sampler: Sampler::new(self.sampler),
            config: *self,
            parameters: MotorParameters::default(),
        }
    }
    pub fn set_sampler(&mut self, sampler: SamplerConfig) -> &mut Self {
        self.sampler = sampler;
        self
    }
    pub fn set_phase(&mut self, phase: PhaseTestConfig) -> &mut Self {
        self.phase = phase;
        self
    }
    pub fn set_hall(&mut self, hall: HallConfig) -> &mut Self {
        self.hall = hall;
        self
    }
    pub fn set_pole_pairs(&mut self, pole_pairs: PolePairConfig) -> &mut Self {
        self.pole_pairs = pole_pairs;
        self
    }
    pub fn set_open_loop(&mut self, open_loop: OpenLoopConfig) -> &mut Self {
        self.open_loop = open_loop;
        self
    }
    pub fn sampler(&self) -> &SamplerConfig {
        &self.sampler
    }
    pub fn phase(&self) -> &PhaseTestConfig {
        &self.phase
    }
    pub fn hall(&self) -> &HallConfig {
        &self.hall
    }
    pub fn pole_pairs(&self) -> &PolePairConfig {
        &self.pole_pairs
    }
    pub fn open_loop(&self) -> &OpenLoopConfig {
        &self.open_loop
    }
}
