//! Rendering collaborator interface.
//!
//! The tracing core hands plain data to a [`Renderer`] and gets operator
//! commands back; layout and styling live entirely in the implementation
//! (see [`ConsoleRenderer`](crate::ConsoleRenderer)).

use std::str::FromStr;

use steptrace_hook::VariableSnapshot;
use thiserror::Error;

use crate::tree::TreeTrace;

/// The only commands an operator can issue at a pause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakpointCommand {
    /// Run one line, then pause again.
    Advance,
    /// Run to completion without further pauses.
    Resume,
    /// End the process.
    Abort,
}

/// Operator input that is not a [`BreakpointCommand`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown command `{0}`")]
pub struct UnknownCommand(pub String);

impl FromStr for BreakpointCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "next" => Ok(Self::Advance),
            "c" | "continue" => Ok(Self::Resume),
            "q" | "quit" => Ok(Self::Abort),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// Step session milestones a renderer may announce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The configured breakpoint line is about to run.
    BreakpointHit { line: u32 },
    /// The operator aborted the session.
    Stopped,
}

/// Presentation side of tracing sessions.
pub trait Renderer: Send {
    /// Show a finished call tree.
    fn render_tree(&mut self, trace: &TreeTrace);

    /// Show a line about to run, its source text and the visible bindings.
    fn render_line(&mut self, line: u32, source: Option<&str>, snapshot: &VariableSnapshot);

    /// Block until the operator picks a command.
    fn render_pause_prompt(&mut self) -> BreakpointCommand;

    /// Show a table of plain rows.
    fn render_table(&mut self, title: &str, headers: &[&str], rows: &[Vec<String>]);

    fn render_notice(&mut self, _notice: Notice) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let parse = |s: &str| s.parse::<BreakpointCommand>();
        assert_eq!(parse("n"), Ok(BreakpointCommand::Advance));
        assert_eq!(parse(" next\n"), Ok(BreakpointCommand::Advance));
        assert_eq!(parse("C"), Ok(BreakpointCommand::Resume));
        assert_eq!(parse("continue"), Ok(BreakpointCommand::Resume));
        assert_eq!(parse("q"), Ok(BreakpointCommand::Abort));
        assert_eq!(parse("Quit"), Ok(BreakpointCommand::Abort));
        assert_eq!(
            "step".parse::<BreakpointCommand>(),
            Err(UnknownCommand("step".to_string()))
        );
    }
}
