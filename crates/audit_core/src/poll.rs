//! Poll state machine for a single audit job.
//!
//! The machine only decides; the caller performs the status request, the
//! result request and the waiting between ticks. Terminal phases absorb
//! every further input.

use std::time::Duration;

use crate::ledger::JobStatus;

pub const MAX_POLL_ATTEMPTS: u32 = 15;
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Polling { attempt: u32 },
    Completed,
    Failed,
    Abandoned,
}

impl PollPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollPhase::Polling { .. })
    }
}

/// What to do at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStart {
    FetchStatus { attempt: u32 },
    /// The attempt budget is spent; the machine is now `Abandoned`.
    Abandon { attempts: u32 },
    /// Already terminal, nothing to do.
    Finished,
}

/// What to do after a status arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Wait one interval and tick again. `recognized` is false for statuses
    /// the client does not know.
    Reschedule { recognized: bool },
    /// Fetch the result reference, then call [`PollMachine::result_fetched`]
    /// or [`PollMachine::abort`].
    FetchResult,
    /// The service reported failure; the machine is now `Failed`.
    Failed,
    /// Already terminal, the status was ignored.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    /// True for the first status received by this machine.
    pub first_response: bool,
    pub next: NextStep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollMachine {
    phase: PollPhase,
    max_attempts: u32,
    responses: u32,
}

impl Default for PollMachine {
    fn default() -> Self {
        Self::new(MAX_POLL_ATTEMPTS)
    }
}

impl PollMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            phase: PollPhase::Polling { attempt: 0 },
            max_attempts,
            responses: 0,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn begin_tick(&mut self) -> TickStart {
        match self.phase {
            PollPhase::Polling { attempt } if attempt >= self.max_attempts => {
                self.phase = PollPhase::Abandoned;
                TickStart::Abandon { attempts: attempt }
            }
            PollPhase::Polling { attempt } => TickStart::FetchStatus { attempt },
            _ => TickStart::Finished,
        }
    }

    pub fn observe_status(&mut self, status: &JobStatus) -> Observed {
        let PollPhase::Polling { attempt } = self.phase else {
            return Observed {
                first_response: false,
                next: NextStep::Ignored,
            };
        };
        let first_response = self.responses == 0;
        self.responses += 1;

        let next = match status {
            JobStatus::Completed => NextStep::FetchResult,
            JobStatus::Failed => {
                self.phase = PollPhase::Failed;
                NextStep::Failed
            }
            other => {
                self.phase = PollPhase::Polling {
                    attempt: attempt + 1,
                };
                NextStep::Reschedule {
                    recognized: other.is_in_progress(),
                }
            }
        };
        Observed {
            first_response,
            next,
        }
    }

    pub fn result_fetched(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = PollPhase::Completed;
        }
    }

    /// A request failed; the loop stops without retrying.
    pub fn abort(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = PollPhase::Failed;
        }
    }
}
