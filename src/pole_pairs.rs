//! Pole-pair detection by counting hall transitions while spinning slowly.
use crate::hardware::{Hardware, MotorControl};
use crate::util::Deadline;

/// Reported when no hall transition was seen at all
pub const FALLBACK_POLE_PAIRS: u32 = 7;
/// Hall transitions produced per pole pair over one mechanical turn
pub const TRANSITIONS_PER_POLE_PAIR: u32 = 6;

#[derive(Debug, Clone, Copy)]
pub struct PolePairConfig {
    /// Open-loop volts used to turn the shaft
    pub spin_voltage: f32,
    /// Wait after starting the drive before sampling
    pub spin_up_ms: u32,
    pub poll_interval_ms: u32,
    pub timeout_ms: u32,
    /// Stop counting once this many transitions are seen
    pub target_transitions: u32,
}

impl Default for PolePairConfig {
    fn default() -> Self {
        PolePairConfig {
            spin_voltage: 1.,
            spin_up_ms: 100,
            poll_interval_ms: 1,
            timeout_ms: 5000,
            target_transitions: TRANSITIONS_PER_POLE_PAIR,
        }
    }
}

/// Integer division of the transition count.
///
/// A timeout with 1 to 5 transitions truncates to zero pole pairs. That
/// result is kept as is and only flagged in the log.
pub fn pole_pairs_from_transitions(transitions: u32) -> u32 {
    if transitions == 0 {
        log::warn!(
            "No hall transitions, assuming {} pole pairs",
            FALLBACK_POLE_PAIRS
        );
        return FALLBACK_POLE_PAIRS;
    }
    let pole_pairs = transitions / TRANSITIONS_PER_POLE_PAIR;
    if pole_pairs == 0 {
        log::warn!(
            "Only {} hall transitions before timeout, pole pairs truncated to 0",
            transitions
        );
    }
    pole_pairs
}

/// Count hall code changes until the target count or the timeout
pub fn count_transitions<B>(board: &mut B, config: &PolePairConfig) -> u32
where
    B: Hardware + MotorControl,
{
    let mut transitions = 0;
    // The timeout covers the spin-up too
    let deadline = Deadline::new(board.now_ms(), config.timeout_ms);

    board.move_open_loop(config.spin_voltage);
    board.delay_ms(config.spin_up_ms);

    let mut previous = board.read_halls().code();
    while !deadline.expired(board.now_ms()) {
        let code = board.read_halls().code();
        if code != previous {
            transitions += 1;
            previous = code;
        }
        if transitions >= config.target_transitions {
            break;
        }
        board.delay_ms(config.poll_interval_ms);
    }

    board.move_open_loop(0.);
    transitions
}

pub fn detect_pole_pairs<B>(board: &mut B, config: &PolePairConfig) -> u32
where
    B: Hardware + MotorControl,
{
    let transitions = count_transitions(board, config);
    let pole_pairs = pole_pairs_from_transitions(transitions);
    log::info!(
        "Detected {} pole pairs from {} transitions",
        pole_pairs,
        transitions
    );
    pole_pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBoard;

    #[test]
    fn transition_counts_map_to_pole_pairs() {
        assert_eq!(pole_pairs_from_transitions(0), 7);
        assert_eq!(pole_pairs_from_transitions(6), 1);
        assert_eq!(pole_pairs_from_transitions(12), 2);
        // Truncation on a short count is preserved
        assert_eq!(pole_pairs_from_transitions(5), 0);
    }

    #[test]
    fn stops_after_target_transitions() {
        let mut board = SimBoard::healthy();
        let config = PolePairConfig::default();

        assert_eq!(count_transitions(&mut board, &config), 6);
        assert!(board.now_ms() < config.timeout_ms);
        assert_eq!(board.open_loop_voltage(), 0.);
    }

    #[test]
    fn larger_target_counts_more_pole_pairs() {
        let mut board = SimBoard::healthy();
        let config = PolePairConfig {
            target_transitions: 12,
            ..PolePairConfig::default()
        };

        assert_eq!(detect_pole_pairs(&mut board, &config), 2);
    }

    #[test]
    fn still_rotor_falls_back() {
        let mut board = SimBoard::healthy();
        board.set_hall_sequence(&[3]);
        let config = PolePairConfig {
            timeout_ms: 200,
            ..PolePairConfig::default()
        };

        assert_eq!(detect_pole_pairs(&mut board, &config), FALLBACK_POLE_PAIRS);
        assert!(board.now_ms() >= 200);
        assert!(board.now_ms() < 300);
    }

    #[test]
    fn short_timeout_truncates_to_zero() {
        let mut board = SimBoard::healthy();
        // 100 ms spin-up, then a transition every 5 ms: five before the timeout
        let config = PolePairConfig {
            timeout_ms: 127,
            ..PolePairConfig::default()
        };

        assert_eq!(count_transitions(&mut board, &config), 5);

        let mut board = SimBoard::healthy();
        assert_eq!(detect_pole_pairs(&mut board, &config), 0);
        assert_eq!(board.open_loop_voltage(), 0.);
    }
}
