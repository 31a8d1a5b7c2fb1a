//! Cycle bookkeeping for a fixed time step.

use std::ops::Range;

use pv_core::{CoreResult, steps_per_cycle, whole_second};

/// A simulated second that just completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleBoundary {
    /// 1-based cycle index (the whole second reached).
    pub cycle: u32,
    /// Step indices belonging to the cycle.
    pub window: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleClock {
    dt: f64,
    steps_per_cycle: usize,
}

impl CycleClock {
    pub fn new(dt: f64) -> CoreResult<Self> {
        Ok(Self {
            dt,
            steps_per_cycle: steps_per_cycle(dt)?,
        })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn steps_per_cycle(&self) -> usize {
        self.steps_per_cycle
    }

    /// `[(c−1)·S, c·S)`
    pub fn window(&self, cycle: u32) -> Range<usize> {
        window(cycle, self.steps_per_cycle)
    }

    /// Whether a step at time `t` completes a cycle. Pure in `t`.
    pub fn boundary_at(&self, t: f64) -> Option<CycleBoundary> {
        whole_second(t, self.dt).map(|cycle| CycleBoundary {
            cycle,
            window: self.window(cycle),
        })
    }
}

pub(crate) fn window(cycle: u32, steps_per_cycle: usize) -> Range<usize> {
    let c = cycle as usize;
    c.saturating_sub(1) * steps_per_cycle..c * steps_per_cycle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_every_second_after_start_up() {
        let clock = CycleClock::new(0.1).unwrap();
        let closed: Vec<u32> = (1..=30)
            .filter_map(|k| clock.boundary_at(f64::from(k) * 0.1))
            .map(|b| b.cycle)
            .collect();
        assert_eq!(closed, vec![1, 2, 3]);
        assert_eq!(clock.window(2), 10..20);
    }

    #[test]
    fn half_second_is_excluded() {
        let clock = CycleClock::new(0.5).unwrap();
        assert_eq!(clock.boundary_at(0.5), None);
        assert_eq!(clock.boundary_at(1.0).map(|b| b.cycle), Some(1));
        assert!(CycleClock::new(0.0).is_err());
    }
}
