//! Guarded open-loop six-step drive, commutated directly off the hall code.
use alloc::format;
use alloc::string::String;

use crate::hall::LineToggles;
use crate::hardware::{Hardware, MotorControl};
use crate::modulation::six_step;
use crate::sampler::Sampler;
use crate::util::Deadline;

#[derive(Debug, Clone, Copy)]
pub struct SafetyLimits {
    /// Amps, any sample strictly above aborts the drive
    pub current_limit: f32,
    /// Duty ceiling, requests are clamped to [0, max_duty]
    pub max_duty: f32,
    // Block construction so the limits are always validated
    _private: (),
}

impl SafetyLimits {
    pub fn new(current_limit: f32, max_duty: f32) -> Self {
        if !(current_limit > 0.) {
            log::error!("Invalid current limit: {}", current_limit);
            panic!();
        }
        if !(max_duty > 0. && max_duty <= 1.) {
            log::error!("Invalid duty ceiling: {}", max_duty);
            panic!();
        }
        SafetyLimits {
            current_limit,
            max_duty,
            _private: (),
        }
    }
}

impl Default for SafetyLimits {
    fn default() -> Self {
        SafetyLimits::new(10., 0.5)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpenLoopConfig {
    pub limits: SafetyLimits,
    /// Wait after disabling closed-loop control
    pub settle_ms: u32,
    pub poll_interval_ms: u32,
}

impl OpenLoopConfig {
    pub fn new(limits: SafetyLimits) -> Self {
        OpenLoopConfig {
            limits,
            settle_ms: 100,
            poll_interval_ms: 1,
        }
    }
}

impl Default for OpenLoopConfig {
    fn default() -> Self {
        OpenLoopConfig::new(SafetyLimits::default())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenLoopTestResult {
    pub success: bool,
    /// Amps
    pub max_current: f32,
    /// Amps
    pub avg_current: f32,
    pub current_limit_exceeded: bool,
    pub halls_working: bool,
    pub error_message: String,
}

/// NaN requests drive nothing
pub fn clamp_duty(duty: f32, max_duty: f32) -> f32 {
    if duty.is_nan() {
        return 0.;
    }
    duty.clamp(0., max_duty)
}

fn stop<B: Hardware + MotorControl>(board: &mut B) {
    board.zero_outputs();
    board.disable();
}

/// Drive the motor with hall-keyed six-step commutation for `duration_ms`.
///
/// Aborts with a partial result on the first sample over the current limit,
/// or on the first hall code outside the valid set.
pub fn run_open_loop_test<B>(
    board: &mut B,
    sampler: &Sampler,
    config: &OpenLoopConfig,
    duty_cycle: f32,
    duration_ms: u32,
) -> OpenLoopTestResult
where
    B: Hardware + MotorControl,
{
    let mut result = OpenLoopTestResult::default();
    let limits = config.limits;

    let duty = clamp_duty(duty_cycle, limits.max_duty);
    if duty != duty_cycle {
        log::warn!("Duty cycle {} clamped to {}", duty_cycle, duty);
    }
    log::info!("Open-loop test: duty {} for {} ms", duty, duration_ms);

    board.disable();
    board.delay_ms(config.settle_ms);

    let initial = board.read_halls();
    let mut toggles = LineToggles::default();
    let mut current_sum = 0.;
    let mut samples = 0u32;

    let deadline = Deadline::new(board.now_ms(), duration_ms);
    while !deadline.expired(board.now_ms()) {
        let current = sampler.read_current(board);
        current_sum += current;
        samples += 1;
        if current > result.max_current {
            result.max_current = current;
        }

        if current > limits.current_limit {
            stop(board);
            log::error!("Current limit exceeded: {} A", current);
            result.current_limit_exceeded = true;
            result.avg_current = current_sum / samples as f32;
            result.error_message = format!("Current limit exceeded: {:.2}A", current);
            return result;
        }

        let lines = board.read_halls();
        toggles.update(initial, lines);

        let code = lines.code();
        match six_step(code, duty) {
            Some(duties) => board.set_pwm(duties),
            None => {
                stop(board);
                log::error!("Invalid hall state during commutation: {:03b}", code.bits());
                result.avg_current = current_sum / samples as f32;
                result.error_message = format!("Invalid hall state detected: {}", code.bits());
                return result;
            }
        }

        board.delay_ms(config.poll_interval_ms);
    }

    stop(board);

    if samples > 0 {
        result.avg_current = current_sum / samples as f32;
    }
    result.halls_working = toggles.all();
    // The drive succeeded even when a sensor did not, both are reported
    result.success = true;
    if !result.halls_working {
        let mut message = String::from("Not all hall sensors changed state. ");
        for (toggled, name) in [(toggles.a, "A"), (toggles.b, "B"), (toggles.c, "C")] {
            if !toggled {
                message.push_str(&format!("Hall {} stuck. ", name));
            }
        }
        log::warn!("{}", message);
        result.error_message = message;
    }

    log::info!(
        "Open-loop test done: max {} A, avg {} A over {} samples",
        result.max_current,
        result.avg_current,
        samples
    );
    result
}
