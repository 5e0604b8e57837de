//! Helpers for tests that drive tracing sessions.

use std::collections::VecDeque;

use parking_lot::{Mutex, MutexGuard};
use steptrace_hook::VariableSnapshot;

use crate::render::{BreakpointCommand, Notice, Renderer};
use crate::tree::TreeTrace;

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

/// Serialise tests that open sessions; the router is process-wide.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock()
}

/// Exit hook that panics with `exit(code)` instead of ending the process.
pub fn panic_exit(code: i32) -> ! {
    panic!("exit({code})")
}

/// Renderer that records everything and answers prompts from a script.
///
/// Once the script runs out every prompt resumes.
#[derive(Debug, Default)]
pub struct ScriptedRenderer {
    pub commands: VecDeque<BreakpointCommand>,
    pub trees: Vec<TreeTrace>,
    /// `(line, snapshot)` of every rendered line.
    pub lines: Vec<(u32, VariableSnapshot)>,
    pub sources: Vec<Option<String>>,
    pub prompts: usize,
    pub notices: Vec<Notice>,
    /// `(title, headers, rows)` of every rendered table.
    pub tables: Vec<(String, Vec<String>, Vec<Vec<String>>)>,
}

impl ScriptedRenderer {
    pub fn with_commands(commands: impl IntoIterator<Item = BreakpointCommand>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Renderer for ScriptedRenderer {
    fn render_tree(&mut self, trace: &TreeTrace) {
        self.trees.push(trace.clone());
    }

    fn render_line(&mut self, line: u32, source: Option<&str>, snapshot: &VariableSnapshot) {
        self.lines.push((line, snapshot.clone()));
        self.sources.push(source.map(str::to_string));
    }

    fn render_pause_prompt(&mut self) -> BreakpointCommand {
        self.prompts += 1;
        self.commands.pop_front().unwrap_or(BreakpointCommand::Resume)
    }

    fn render_table(&mut self, title: &str, headers: &[&str], rows: &[Vec<String>]) {
        self.tables.push((
            title.to_string(),
            headers.iter().map(|h| (*h).to_string()).collect(),
            rows.to_vec(),
        ));
    }

    fn render_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
