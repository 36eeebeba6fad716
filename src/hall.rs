//! Hall sensor validation: toggle observation and static pattern checks.
use crate::hardware::{Hardware, HallLines, MotorControl};
use crate::util::Deadline;

/// The six 60°-spaced commutation states, in rotation order
pub const VALID_HALL_CODES: [u8; 6] = [1, 3, 2, 6, 4, 5];

/// 3-bit hall code, `A<<2 | B<<1 | C`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HallCode(u8);

impl HallCode {
    pub fn new(bits: u8) -> Self {
        HallCode(bits & 0b111)
    }
    pub fn from_lines(lines: HallLines) -> Self {
        HallCode((lines.a as u8) << 2 | (lines.b as u8) << 1 | lines.c as u8)
    }
    pub fn bits(self) -> u8 {
        self.0
    }
    pub fn is_valid(self) -> bool {
        VALID_HALL_CODES.contains(&self.0)
    }
    pub fn lines(self) -> HallLines {
        HallLines::new(self.0 & 0b100 != 0, self.0 & 0b010 != 0, self.0 & 0b001 != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HallStatus {
    pub hall_a_ok: bool,
    pub hall_b_ok: bool,
    pub hall_c_ok: bool,
    pub hall_a_changing: bool,
    pub hall_b_changing: bool,
    pub hall_c_changing: bool,
}

impl HallStatus {
    pub fn all_ok(&self) -> bool {
        self.hall_a_ok && self.hall_b_ok && self.hall_c_ok
    }
}

/// Per-line "has differed from the reference" bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineToggles {
    pub a: bool,
    pub b: bool,
    pub c: bool,
}

impl LineToggles {
    pub fn update(&mut self, reference: HallLines, now: HallLines) {
        self.a |= now.a != reference.a;
        self.b |= now.b != reference.b;
        self.c |= now.c != reference.c;
    }
    pub fn all(&self) -> bool {
        self.a && self.b && self.c
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HallConfig {
    /// Open-loop volts used to coast the rotor past hall edges
    pub spin_voltage: f32,
    pub poll_interval_ms: u32,
    /// Observation window used by the health check
    pub observe_window_ms: u32,
    /// Timeout for the quick all-lines-toggle check
    pub verify_timeout_ms: u32,
}

impl Default for HallConfig {
    fn default() -> Self {
        HallConfig {
            spin_voltage: 1.,
            poll_interval_ms: 1,
            observe_window_ms: 1000,
            verify_timeout_ms: 1000,
        }
    }
}

/// Spin the shaft for `window_ms` and record which lines toggle, then check
/// the resting code against the valid set.
pub fn observe_halls<B>(board: &mut B, config: &HallConfig, window_ms: u32) -> HallStatus
where
    B: Hardware + MotorControl,
{
    let initial = board.read_halls();
    let mut toggles = LineToggles::default();

    board.move_open_loop(config.spin_voltage);
    let deadline = Deadline::new(board.now_ms(), window_ms);
    while !deadline.expired(board.now_ms()) {
        toggles.update(initial, board.read_halls());
        board.delay_ms(config.poll_interval_ms);
    }
    board.move_open_loop(0.);

    let mut status = HallStatus {
        hall_a_ok: toggles.a,
        hall_b_ok: toggles.b,
        hall_c_ok: toggles.c,
        hall_a_changing: toggles.a,
        hall_b_changing: toggles.b,
        hall_c_changing: toggles.c,
    };
    log::debug!("Hall toggles over {} ms: {:?}", window_ms, toggles);

    validate_pattern(&mut status, board.read_halls().code());
    status
}

/// An invalid resting code means miswiring, even if every line moved
pub fn validate_pattern(status: &mut HallStatus, code: HallCode) {
    if !code.is_valid() {
        log::warn!("Invalid hall pattern: {:03b}", code.bits());
        status.hall_a_ok = false;
        status.hall_b_ok = false;
        status.hall_c_ok = false;
    }
}

/// True as soon as every line has toggled at least once, false on timeout.
/// No pattern validation.
pub fn verify_hall_sensors<B>(board: &mut B, config: &HallConfig) -> bool
where
    B: Hardware + MotorControl,
{
    let initial = board.read_halls();
    let mut toggles = LineToggles::default();

    board.move_open_loop(config.spin_voltage);
    let deadline = Deadline::new(board.now_ms(), config.verify_timeout_ms);
    while !deadline.expired(board.now_ms()) {
        toggles.update(initial, board.read_halls());
        if toggles.all() {
            board.move_open_loop(0.);
            log::info!("All hall lines toggled");
            return true;
        }
        board.delay_ms(config.poll_interval_ms);
    }
    board.move_open_loop(0.);

    log::warn!("Hall verification timed out, toggles: {:?}", toggles);
    false
}
