//! Simulated board for tests: virtual clock, resistive windings, an ADC front
//! end and a hall sequence that advances while the rotor is driven.
use std::collections::VecDeque;

use crate::hall::{HallCode, VALID_HALL_CODES};
use crate::hardware::{AnalogChannel, Direction, Hardware, HallLines, MotorControl};
use crate::modulation::{Phase, PhaseDuties};
use crate::sampler::SamplerConfig;

#[derive(Debug)]
pub struct SimBoard {
    adc: SamplerConfig,
    now_ms: u32,
    duties: PhaseDuties,
    max_duties: PhaseDuties,
    open_loop_voltage: f32,
    /// Ohms per leg, infinite when disconnected
    resistances: [f32; 3],
    forced_current: Option<f32>,
    queued_current_counts: VecDeque<u16>,
    bus_voltage: f32,
    hall_sequence: Vec<u8>,
    ms_per_hall_step: u32,
    // Driven time, the rotor only turns while something drives it
    spin_ms: u32,
    stuck: [Option<bool>; 3],
    disable_count: u32,
    voltage_limit: f32,
    direction: Direction,
    foc_initialized: bool,
}

impl SimBoard {
    pub fn new(adc: SamplerConfig) -> Self {
        SimBoard {
            adc,
            now_ms: 0,
            duties: PhaseDuties::zero(),
            max_duties: PhaseDuties::zero(),
            open_loop_voltage: 0.,
            resistances: [2.; 3],
            forced_current: None,
            queued_current_counts: VecDeque::new(),
            bus_voltage: 24.,
            hall_sequence: VALID_HALL_CODES.to_vec(),
            ms_per_hall_step: 5,
            spin_ms: 0,
            stuck: [None; 3],
            disable_count: 0,
            voltage_limit: 12.,
            direction: Direction::Clockwise,
            foc_initialized: false,
        }
    }

    /// 2 Ohm windings, rotating halls and a 16-bit ADC fine enough to
    /// resolve milliamp currents
    pub fn healthy() -> Self {
        SimBoard::new(SamplerConfig {
            adc_reference: 3.3,
            adc_max_count: u16::MAX,
            current_sense_ratio: 0.1,
            bus_divider_ratio: 60. / 3.2,
            samples: 10,
            sample_delay_ms: 1,
        })
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        self.adc
    }

    pub fn set_phase_resistance(&mut self, phase: Phase, ohms: f32) {
        self.resistances[phase as usize] = ohms;
    }
    pub fn disconnect_phase(&mut self, phase: Phase) {
        self.resistances[phase as usize] = f32::INFINITY;
    }
    pub fn force_current(&mut self, amps: f32) {
        self.forced_current = Some(amps);
    }
    pub fn queue_current_counts(&mut self, counts: &[u16]) {
        self.queued_current_counts.extend(counts.iter().copied());
    }
    pub fn set_bus_voltage(&mut self, volts: f32) {
        self.bus_voltage = volts;
    }
    pub fn set_hall_sequence(&mut self, codes: &[u8]) {
        self.hall_sequence = codes.to_vec();
    }
    pub fn stick_hall_a(&mut self, level: bool) {
        self.stuck[0] = Some(level);
    }
    pub fn stick_hall_b(&mut self, level: bool) {
        self.stuck[1] = Some(level);
    }
    pub fn stick_hall_c(&mut self, level: bool) {
        self.stuck[2] = Some(level);
    }

    pub fn duties(&self) -> PhaseDuties {
        self.duties
    }
    /// Per-leg maximum over every `set_pwm` so far
    pub fn max_duties(&self) -> PhaseDuties {
        self.max_duties
    }
    pub fn open_loop_voltage(&self) -> f32 {
        self.open_loop_voltage
    }
    pub fn disable_count(&self) -> u32 {
        self.disable_count
    }
    pub fn foc_initialized(&self) -> bool {
        self.foc_initialized
    }

    fn driven(&self) -> bool {
        self.open_loop_voltage != 0. || self.duties.max() > 0.
    }

    fn winding_current(&self) -> f32 {
        let PhaseDuties { a, b, c } = self.duties;
        a / self.resistances[0] + b / self.resistances[1] + c / self.resistances[2]
    }

    fn volts_to_counts(&self, volts: f32) -> u16 {
        let max = self.adc.adc_max_count as f32;
        (volts / self.adc.adc_reference * max).round().clamp(0., max) as u16
    }
}

impl Hardware for SimBoard {
    fn read_halls(&mut self) -> HallLines {
        let step = (self.spin_ms / self.ms_per_hall_step) as usize;
        let code = self.hall_sequence[step % self.hall_sequence.len()];
        let mut lines = HallCode::new(code).lines();
        if let Some(level) = self.stuck[0] {
            lines.a = level;
        }
        if let Some(level) = self.stuck[1] {
            lines.b = level;
        }
        if let Some(level) = self.stuck[2] {
            lines.c = level;
        }
        lines
    }

    fn set_pwm(&mut self, duties: PhaseDuties) {
        self.duties = duties;
        self.max_duties = PhaseDuties::new(
            self.max_duties.a.max(duties.a),
            self.max_duties.b.max(duties.b),
            self.max_duties.c.max(duties.c),
        );
    }

    fn read_analog(&mut self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::CurrentSense => {
                if let Some(counts) = self.queued_current_counts.pop_front() {
                    return counts;
                }
                let amps = self.forced_current.unwrap_or_else(|| self.winding_current());
                self.volts_to_counts(amps * self.adc.current_sense_ratio)
            }
            AnalogChannel::BusVoltage => {
                self.volts_to_counts(self.bus_voltage / self.adc.bus_divider_ratio)
            }
        }
    }

    fn now_ms(&self) -> u32 {
        self.now_ms
    }

    fn delay_ms(&mut self, ms: u32) {
        if self.driven() {
            self.spin_ms += ms;
        }
        self.now_ms = self.now_ms.wrapping_add(ms);
    }
}

impl MotorControl for SimBoard {
    fn disable(&mut self) {
        self.disable_count += 1;
        self.foc_initialized = false;
    }
    fn move_open_loop(&mut self, voltage: f32) {
        self.open_loop_voltage = voltage;
    }
    fn voltage_limit(&self) -> f32 {
        self.voltage_limit
    }
    fn set_voltage_limit(&mut self, volts: f32) {
        self.voltage_limit = volts;
    }
    fn sensor_direction(&self) -> Direction {
        self.direction
    }
    fn set_sensor_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }
    fn init_foc(&mut self) {
        self.foc_initialized = true;
    }
}
