//! Capabilities the diagnostic engine needs from the board and from the
//! closed-loop motor controller it temporarily takes over from.
use crate::hall::HallCode;
use crate::modulation::PhaseDuties;

/// Instantaneous digital state of the three hall lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HallLines {
    pub a: bool,
    pub b: bool,
    pub c: bool,
}

impl HallLines {
    pub fn new(a: bool, b: bool, c: bool) -> Self {
        HallLines { a, b, c }
    }
    pub fn code(self) -> HallCode {
        HallCode::from_lines(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogChannel {
    /// Low-side current sense amplifier output
    CurrentSense,
    /// Divided-down supply rail
    BusVoltage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// Raw board I/O.
///
/// Implementations are expected to be infallible: a failed ADC conversion
/// reads as some count, a failed GPIO read as some level.
pub trait Hardware {
    fn read_halls(&mut self) -> HallLines;
    /// Per-leg drive level, in the units the driver accepts for `setPwm`
    fn set_pwm(&mut self, duties: PhaseDuties);
    /// Raw ADC counts
    fn read_analog(&mut self, channel: AnalogChannel) -> u16;
    /// Monotonic milliseconds, wrapping allowed
    fn now_ms(&self) -> u32;
    fn delay_ms(&mut self, ms: u32);

    fn zero_outputs(&mut self) {
        self.set_pwm(PhaseDuties::zero());
    }
}

/// The closed-loop controller's surface. Diagnostics disable it and use its
/// open-loop `move` to spin the shaft; re-enabling is left to the caller.
pub trait MotorControl {
    fn disable(&mut self);
    /// Constant open-loop drive, volts. Zero stops the drive.
    fn move_open_loop(&mut self, voltage: f32);
    fn voltage_limit(&self) -> f32;
    fn set_voltage_limit(&mut self, volts: f32);
    fn sensor_direction(&self) -> Direction;
    fn set_sensor_direction(&mut self, direction: Direction);
    fn init_foc(&mut self);
}
