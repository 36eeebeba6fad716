//! Background monitoring between explicit test runs.
use libm::fabsf;

use crate::diagnostics::Diagnostics;
use crate::hardware::{Hardware, MotorControl};
use crate::health::MotorHealth;
use crate::util::elapsed_ms;

#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub health_interval_ms: u32,
    pub voltage_interval_ms: u32,
    /// Amps, smaller idle currents are not reported
    pub current_report_threshold: f32,
    /// Volts of drift before the motor voltage limit follows the bus
    pub voltage_retarget_threshold: f32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfig {
            health_interval_ms: 1000,
            voltage_interval_ms: 1000,
            current_report_threshold: 0.1,
            voltage_retarget_threshold: 0.5,
        }
    }
}

/// What a poll found worth publishing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupervisorReport {
    /// Only present when something failed
    pub health: Option<MotorHealth>,
    /// Amps
    pub current: Option<f32>,
    /// Bus volts
    pub bus_voltage: Option<f32>,
}

impl SupervisorReport {
    pub fn is_empty(&self) -> bool {
        self.health.is_none() && self.current.is_none() && self.bus_voltage.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Supervisor {
    config: SupervisorConfig,
    last_health_ms: u32,
    last_voltage_ms: u32,
    // Set while an explicit test or measurement owns the motor
    busy: bool,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, now_ms: u32) -> Self {
        Supervisor {
            config,
            last_health_ms: now_ms,
            last_voltage_ms: now_ms,
            busy: false,
        }
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Run whichever periodic checks are due
    pub fn poll<B>(&mut self, diagnostics: &mut Diagnostics<B>) -> SupervisorReport
    where
        B: Hardware + MotorControl,
    {
        let mut report = SupervisorReport::default();
        let now = diagnostics.now_ms();

        if !self.busy && elapsed_ms(now, self.last_health_ms) >= self.config.health_interval_ms {
            self.last_health_ms = now;

            let health = diagnostics.check_motor_health();
            if health.has_faults() {
                report.health = Some(health);
            }

            let current = diagnostics.get_current_reading();
            if current > self.config.current_report_threshold {
                report.current = Some(current);
            }
        }

        if elapsed_ms(now, self.last_voltage_ms) >= self.config.voltage_interval_ms {
            self.last_voltage_ms = now;

            let voltage = diagnostics.measure_input_voltage();
            report.bus_voltage = Some(voltage);

            let limit = diagnostics.settings().voltage_limit;
            if fabsf(limit - voltage) > self.config.voltage_retarget_threshold {
                log::info!("Bus moved to {} V, retargeting voltage limit", voltage);
                diagnostics.set_voltage_limit(voltage);
            }
        }

        report
    }
}
