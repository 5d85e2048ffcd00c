use super::ActionState;

/// Producer of the packed action state read once per tick (device mapping lives elsewhere).
pub trait InputSource {
    fn poll(&mut self) -> u16;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStep {
    pub ticks: u32,
    pub state: u16,
}

impl ScriptStep {
    pub fn new(ticks: u32, state: ActionState) -> Self {
        Self {
            ticks,
            state: state.state(),
        }
    }
}

/// Loops over a fixed list of steps. Used by the headless client.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    steps: Vec<ScriptStep>,
    index: usize,
    elapsed: u32,
}

impl ScriptedInput {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            index: 0,
            elapsed: 0,
        }
    }

    /// Thrust while slowly turning, pause, fire a burst, warp once.
    pub fn patrol() -> Self {
        let mut cruise = ActionState::new();
        cruise.set_thrusting(true);
        cruise.set_right(0.25);

        let coast = ActionState::new();

        let mut attack = ActionState::new();
        attack.set_firing(true);
        attack.set_left(0.5);

        let mut warp = ActionState::new();
        warp.set_warp(true);

        Self::new(vec![
            ScriptStep::new(180, cruise),
            ScriptStep::new(60, coast),
            ScriptStep::new(90, attack),
            ScriptStep::new(1, warp),
        ])
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> u16 {
        let Some(step) = self.steps.get(self.index).copied() else {
            return 0;
        };

        self.elapsed += 1;
        if self.elapsed >= step.ticks {
            self.elapsed = 0;
            self.index = (self.index + 1) % self.steps.len();
        }

        step.state
    }
}
