//! Step session state machine.

use std::num::NonZeroU32;

use steptrace_hook::{FunctionMeta, Verdict, VariableSnapshot};
use tracing::debug;

use crate::render::{BreakpointCommand, Notice, Renderer};

/// Where a step session stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepState {
    Running,
    Paused,
    Terminated,
}

/// Why the controller paused on a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseReason {
    /// The configured breakpoint line is about to run.
    Breakpoint,
    /// The previous pause was answered with [`BreakpointCommand::Advance`].
    Step,
}

/// Decides, line by line, whether a traced call pauses for the operator.
///
/// Starts `Running`. The breakpoint pauses at most until the operator
/// resumes; after `Resume` it stays disarmed for the rest of the session.
/// `Advance` single-steps: the next line pauses regardless of the
/// breakpoint.
#[derive(Clone, Debug)]
pub struct StepController {
    breakpoint: Option<NonZeroU32>,
    state: StepState,
    single_step: bool,
    armed: bool,
    pauses: usize,
}

impl StepController {
    pub const fn new(breakpoint: Option<NonZeroU32>) -> Self {
        Self {
            breakpoint,
            state: StepState::Running,
            single_step: false,
            armed: true,
            pauses: 0,
        }
    }

    pub const fn state(&self) -> StepState {
        self.state
    }

    /// Pauses entered so far.
    pub const fn pauses(&self) -> usize {
        self.pauses
    }

    /// Feed a line about to run; `Some` moves the controller to `Paused`.
    pub fn observe(&mut self, line: u32) -> Option<PauseReason> {
        if self.state != StepState::Running {
            return None;
        }
        let reason = if self.single_step {
            self.single_step = false;
            PauseReason::Step
        } else if self.armed && self.breakpoint.is_some_and(|bp| bp.get() == line) {
            PauseReason::Breakpoint
        } else {
            return None;
        };
        self.state = StepState::Paused;
        self.pauses += 1;
        Some(reason)
    }

    /// Apply the operator's answer to the current pause.
    pub fn command(&mut self, command: BreakpointCommand) -> Verdict {
        debug_assert_eq!(self.state, StepState::Paused, "command outside a pause");
        match command {
            BreakpointCommand::Advance => {
                self.state = StepState::Running;
                self.single_step = true;
                Verdict::Continue
            }
            BreakpointCommand::Resume => {
                self.state = StepState::Running;
                self.single_step = false;
                self.armed = false;
                Verdict::Continue
            }
            BreakpointCommand::Abort => {
                self.state = StepState::Terminated;
                Verdict::Abort
            }
        }
    }

    /// The traced call completed.
    pub const fn finish(&mut self) {
        self.state = StepState::Terminated;
        self.single_step = false;
    }
}

/// Show one line without consulting the controller.
pub(crate) fn show_line<R: Renderer + ?Sized>(
    renderer: &mut R,
    meta: &FunctionMeta,
    snapshot: &VariableSnapshot,
) {
    let line = snapshot.line();
    renderer.render_line(line, meta.source_line(line), snapshot);
}

/// Show one line and, if the controller pauses on it, collect the
/// operator's command.
pub(crate) fn step_line<R: Renderer + ?Sized>(
    controller: &mut StepController,
    renderer: &mut R,
    meta: &FunctionMeta,
    snapshot: &VariableSnapshot,
) -> Verdict {
    show_line(renderer, meta, snapshot);

    let line = snapshot.line();
    let Some(reason) = controller.observe(line) else {
        return Verdict::Continue;
    };
    if reason == PauseReason::Breakpoint {
        renderer.render_notice(Notice::BreakpointHit { line });
    }

    let command = renderer.render_pause_prompt();
    debug!(function = meta.name(), line, ?reason, ?command, "operator command");
    let verdict = controller.command(command);
    if verdict == Verdict::Abort {
        renderer.render_notice(Notice::Stopped);
    }
    verdict
}
