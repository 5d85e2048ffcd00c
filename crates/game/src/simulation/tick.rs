/// Converts wall-clock deltas into a whole number of fixed simulation steps.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
    tick: u64,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
            tick: 0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Number of steps consumed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn accumulate(&mut self, delta: f32) {
        // a long stall must not turn into a burst of catch-up ticks
        self.accumulator += delta.min(0.25);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            self.tick += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(60);

        ts.accumulate(1.0 / 30.0 + 1e-4);
        assert!(ts.should_tick());
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
        assert_eq!(ts.tick(), 2);
    }

    #[test]
    fn long_stalls_are_capped() {
        let mut ts = FixedTimestep::new(10);
        ts.accumulate(5.0);

        let mut ticks = 0;
        while ts.consume_tick() {
            ticks += 1;
        }
        assert!(ticks <= 3);
    }

    #[test]
    fn zero_rate_is_clamped() {
        let ts = FixedTimestep::new(0);
        assert_eq!(ts.tick_rate(), 1);
        assert_eq!(ts.dt(), 1.0);
    }
}
