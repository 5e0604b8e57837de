//! Interactive line stepping.
//!
//! A step session shows every line of the traced function before it runs
//! and pauses for operator input on the configured breakpoint line. The
//! synchronous path prompts from inside the router; the async path moves
//! the [`StepController`] into a tokio task fed over a channel, so a paused
//! session never blocks the scheduler.

mod controller;
mod debugger;

use std::fmt;
use std::num::NonZeroU32;

use steptrace_hook::ExitHook;

pub use controller::{PauseReason, StepController, StepState};
pub use debugger::StepDebugger;

/// Step session configuration.
#[derive(Clone, Copy)]
pub struct StepConfig {
    /// Line that pauses the session; `None` never pauses on its own.
    pub breakpoint_line: Option<NonZeroU32>,
    /// Ends the process when the operator aborts.
    pub exit: ExitHook,
}

impl StepConfig {
    /// Pause on `line`. Line `0` clears the breakpoint.
    #[must_use]
    pub const fn with_breakpoint_line(mut self, line: u32) -> Self {
        self.breakpoint_line = NonZeroU32::new(line);
        self
    }

    #[must_use]
    pub const fn with_exit_hook(mut self, exit: ExitHook) -> Self {
        self.exit = exit;
        self
    }
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            breakpoint_line: None,
            exit: std::process::exit,
        }
    }
}

impl fmt::Debug for StepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepConfig")
            .field("breakpoint_line", &self.breakpoint_line)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = StepConfig::default().with_breakpoint_line(7);
        assert_eq!(config.breakpoint_line.map(NonZeroU32::get), Some(7));
        assert_eq!(config.with_breakpoint_line(0).breakpoint_line, None);
        assert_eq!(format!("{config:?}"), "StepConfig { breakpoint_line: Some(7), .. }");
    }
}
