use core::ops::Mul;

use crate::hall::HallCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    A,
    B,
    C,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    pub fn name(self) -> &'static str {
        match self {
            Phase::A => "A",
            Phase::B => "B",
            Phase::C => "C",
        }
    }
}

/// Drive level per phase leg
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseDuties {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl PhaseDuties {
    pub fn new(a: f32, b: f32, c: f32) -> Self {
        PhaseDuties { a, b, c }
    }
    pub fn zero() -> Self {
        PhaseDuties::new(0., 0., 0.)
    }
    /// Unit drive on exactly one leg, the others held at zero
    pub fn single(phase: Phase) -> Self {
        match phase {
            Phase::A => PhaseDuties::new(1., 0., 0.),
            Phase::B => PhaseDuties::new(0., 1., 0.),
            Phase::C => PhaseDuties::new(0., 0., 1.),
        }
    }
    pub fn max(&self) -> f32 {
        self.a.max(self.b).max(self.c)
    }
}

impl Mul<f32> for PhaseDuties {
    type Output = PhaseDuties;
    fn mul(self, rhs: f32) -> Self::Output {
        PhaseDuties {
            a: self.a * rhs,
            b: self.b * rhs,
            c: self.c * rhs,
        }
    }
}

/// The leg energised for a hall sector. Each leg covers two adjacent 60°
/// sectors. `None` for codes outside the six valid ones.
pub fn commutation_leg(code: HallCode) -> Option<Phase> {
    match code.bits() {
        1 | 5 => Some(Phase::A),
        2 | 3 => Some(Phase::B),
        4 | 6 => Some(Phase::C),
        _ => None,
    }
}

/// Implements hall-keyed six-step modulation: `duty` on one leg, zero on the rest.
pub fn six_step(code: HallCode, duty: f32) -> Option<PhaseDuties> {
    let leg = commutation_leg(code)?;
    log::debug!("Hall code {} drives phase {}", code.bits(), leg.name());
    Some(PhaseDuties::single(leg) * duty)
}
