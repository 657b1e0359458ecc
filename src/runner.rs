use std::{collections::BTreeSet, fmt};

use log::debug;

use crate::{Chip8, Chip8Error, Chip8Result, u4};

/// Instruction budget used when the caller does not pick one.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Settings for a run-to-completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Upper bound on instructions executed by one call to [`Chip8Runner::run`].
    pub max_steps: u64,
    /// Seed for the RND instruction; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            seed: None,
        }
    }
}

/// Why [`Chip8Runner::run`] stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program jumped onto itself.
    Halted,
    /// `max_steps` instructions ran without the program halting.
    BudgetExhausted,
    /// Fx0A is waiting for a key press and release.
    WaitingForKey,
    /// The program counter reached a breakpoint; the instruction there has not run yet.
    HitBreakpoint(u16),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Halted => f.write_str("halted"),
            RunOutcome::BudgetExhausted => f.write_str("instruction budget exhausted"),
            RunOutcome::WaitingForKey => f.write_str("waiting for a key"),
            RunOutcome::HitBreakpoint(addr) => write!(f, "hit breakpoint at {addr:#05X}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Instructions executed by this call.
    pub steps: u64,
}

/// Drives a [`Chip8`] through bounded runs, with optional breakpoints.
pub struct Chip8Runner {
    chip8: Chip8,
    config: RunConfig,
    breakpoints: BTreeSet<u16>,
    /// Breakpoint we last stopped at, so resuming executes it instead of stopping again.
    last_break: Option<u16>,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8, config: RunConfig) -> Self {
        Self {
            chip8,
            config,
            breakpoints: BTreeSet::new(),
            last_break: None,
        }
    }

    /// Builds a machine as described by `config` and loads `rom` into it.
    pub fn from_rom(rom: &[u8], config: RunConfig) -> Result<Self, Chip8Error> {
        let mut chip8 = match config.seed {
            Some(seed) => Chip8::with_seed(seed),
            None => Chip8::new(),
        };
        chip8.load(rom)?;
        Ok(Self::new(chip8, config))
    }

    /// Executes instructions until the program halts, blocks on input, hits a
    /// breakpoint, or `max_steps` instructions have run.
    pub fn run(&mut self) -> Result<RunReport, Chip8Error> {
        let mut steps = 0;

        loop {
            if self.chip8.is_halted() {
                return Ok(Self::report(RunOutcome::Halted, steps));
            }
            if steps >= self.config.max_steps {
                break;
            }

            let pc = self.chip8.pc();
            if self.breakpoints.contains(&pc) && self.last_break != Some(pc) {
                self.last_break = Some(pc);
                return Ok(Self::report(RunOutcome::HitBreakpoint(pc), steps));
            }

            let result = self.chip8.step()?;
            steps += 1;

            match result {
                Chip8Result::Continue => self.last_break = None,
                Chip8Result::Halted => {
                    self.last_break = None;
                    return Ok(Self::report(RunOutcome::Halted, steps));
                }
                // The key wait rewinds onto its own address; it has not moved past a breakpoint.
                Chip8Result::WaitForKey => {
                    return Ok(Self::report(RunOutcome::WaitingForKey, steps));
                }
            }
        }

        Ok(Self::report(RunOutcome::BudgetExhausted, steps))
    }

    fn report(outcome: RunOutcome, steps: u64) -> RunReport {
        debug!("run stopped after {steps} instructions: {outcome}");
        RunReport { outcome, steps }
    }

    pub fn add_breakpoint(&mut self, addr: u16) {
        self.breakpoints.insert(addr);
    }

    pub fn remove_breakpoint(&mut self, addr: u16) -> bool {
        self.breakpoints.remove(&addr)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// Breakpoints in ascending address order.
    pub fn breakpoints(&self) -> impl Iterator<Item = u16> + '_ {
        self.breakpoints.iter().copied()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.chip8.set_key(key, pressed)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }

    pub fn into_inner(self) -> Chip8 {
        self.chip8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(rom: &[u8], max_steps: u64) -> Chip8Runner {
        let config = RunConfig {
            max_steps,
            seed: Some(1),
        };
        Chip8Runner::from_rom(rom, config).unwrap()
    }

    #[test]
    fn default_budget_is_explicit() {
        assert_eq!(RunConfig::default().max_steps, DEFAULT_MAX_STEPS);
    }

    #[test]
    fn runs_until_self_jump() {
        let mut r = runner(&[0x60, 0x05, 0x70, 0x01, 0x12, 0x04], 100);
        let report = r.run().unwrap();
        assert_eq!(
            report,
            RunReport {
                outcome: RunOutcome::Halted,
                steps: 3
            }
        );
        assert_eq!(r.chip8_ref().v()[0], 6);

        let again = r.run().unwrap();
        assert_eq!(
            again,
            RunReport {
                outcome: RunOutcome::Halted,
                steps: 0
            }
        );
    }

    #[test]
    fn zero_budget_still_reports_halt() {
        let mut r = runner(&[0x12, 0x00], 1);
        assert_eq!(r.run().unwrap().outcome, RunOutcome::Halted);

        r.config.max_steps = 0;
        assert_eq!(
            r.run().unwrap(),
            RunReport {
                outcome: RunOutcome::Halted,
                steps: 0
            }
        );
    }

    #[test]
    fn zero_budget_on_a_running_machine_is_exhausted() {
        let mut r = runner(&[0x12, 0x00], 0);
        assert_eq!(r.run().unwrap().outcome, RunOutcome::BudgetExhausted);
        assert!(!r.chip8_ref().is_halted());
    }

    #[test]
    fn stops_at_budget() {
        // 0x200: ADDI V0 1; 0x202: JMP 0x200
        let mut r = runner(&[0x70, 0x01, 0x12, 0x00], 10);
        let report = r.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::BudgetExhausted);
        assert_eq!(report.steps, 10);
        assert_eq!(r.chip8_ref().v()[0], 5);
    }

    #[test]
    fn breakpoint_stops_before_instruction_and_resumes() {
        let mut r = runner(&[0x60, 0x05, 0x70, 0x01, 0x12, 0x04], 100);
        r.add_breakpoint(0x202);

        let report = r.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::HitBreakpoint(0x202));
        assert_eq!(report.steps, 1);
        assert_eq!(r.chip8_ref().v()[0], 5);

        let report = r.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::Halted);
        assert_eq!(r.chip8_ref().v()[0], 6);
        assert_eq!(r.breakpoints().collect::<Vec<_>>(), vec![0x202]);
    }

    #[test]
    fn breakpoint_fires_on_every_loop_iteration() {
        let mut r = runner(&[0x70, 0x01, 0x12, 0x00], 100);
        r.add_breakpoint(0x200);
        assert_eq!(r.run().unwrap().outcome, RunOutcome::HitBreakpoint(0x200));
        assert_eq!(r.run().unwrap().steps, 2);
        assert_eq!(r.chip8_ref().v()[0], 1);
    }

    #[test]
    fn reports_key_wait() {
        let mut r = runner(&[0xF0, 0x0A, 0x12, 0x02], 100);
        assert_eq!(r.run().unwrap().outcome, RunOutcome::WaitingForKey);

        r.set_key(u4::new(4), true);
        assert_eq!(r.run().unwrap().outcome, RunOutcome::WaitingForKey);
        r.set_key(u4::new(4), false);
        assert_eq!(r.run().unwrap().outcome, RunOutcome::Halted);
        assert_eq!(r.chip8_ref().v()[0], 4);
    }

    #[test]
    fn breakpoint_on_key_wait_fires_once() {
        // 0x200: IN V0; 0x202: JMP 0x202
        let mut r = runner(&[0xF0, 0x0A, 0x12, 0x02], 100);
        r.add_breakpoint(0x200);

        let outcomes: Vec<_> = (0..4).map(|_| r.run().unwrap().outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                RunOutcome::HitBreakpoint(0x200),
                RunOutcome::WaitingForKey,
                RunOutcome::WaitingForKey,
                RunOutcome::WaitingForKey,
            ]
        );

        r.set_key(u4::new(9), true);
        assert_eq!(r.run().unwrap().outcome, RunOutcome::WaitingForKey);
        r.set_key(u4::new(9), false);
        assert_eq!(r.run().unwrap().outcome, RunOutcome::Halted);
        assert_eq!(r.chip8_ref().v()[0], 9);
    }

    #[test]
    fn errors_propagate() {
        let mut r = runner(&[0xFF, 0xFF], 100);
        assert_eq!(
            r.run(),
            Err(Chip8Error::UnknownOpcode {
                opcode: 0xFFFF,
                address: 0x200
            })
        );
    }
}
