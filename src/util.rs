/// Milliseconds from `start` to `now`, wrapping allowed
pub fn elapsed_ms(now: u32, start: u32) -> u32 {
    // A wrapped counter is handled by the modular subtraction
    now.wrapping_sub(start)
}

/// Wall-clock bound for a polling loop
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: u32,
    timeout_ms: u32,
}

impl Deadline {
    pub fn new(start: u32, timeout_ms: u32) -> Self {
        Deadline { start, timeout_ms }
    }
    pub fn elapsed(&self, now: u32) -> u32 {
        elapsed_ms(now, self.start)
    }
    pub fn expired(&self, now: u32) -> bool {
        self.elapsed(now) >= self.timeout_ms
    }
}
