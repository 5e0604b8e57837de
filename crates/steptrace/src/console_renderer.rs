//! Terminal renderer.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use console::style;
use steptrace_hook::VariableSnapshot;
use tracing::warn;

use crate::render::{BreakpointCommand, Notice, Renderer};
use crate::terminal::{Alignment, Table};
use crate::tree::{TraceChild, TraceNode, TreeTrace};

const PROMPT: &str = "(n: next, c: continue, q: quit) > ";

/// Renders sessions as styled text and reads operator commands line by
/// line from `input`.
///
/// Write failures are logged and otherwise ignored; a closed or failing
/// `input` answers every prompt with [`BreakpointCommand::Resume`].
pub struct ConsoleRenderer<I, O> {
    input: I,
    output: O,
}

impl ConsoleRenderer<BufReader<Stdin>, Stdout> {
    /// Renderer over the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<I: BufRead + Send, O: Write + Send> ConsoleRenderer<I, O> {
    pub const fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    pub fn into_parts(self) -> (I, O) {
        (self.input, self.output)
    }

    fn emit(&mut self, text: &str) {
        let written = self
            .output
            .write_all(text.as_bytes())
            .and_then(|()| self.output.flush());
        if let Err(err) = written {
            warn!(error = %err, "failed to write renderer output");
        }
    }

    /// Read one command; `None` when the input is exhausted or fails.
    fn read_command(&mut self) -> Option<Result<BreakpointCommand, String>> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.parse().map_err(|_| line.trim().to_string())),
            Err(err) => {
                warn!(error = %err, "failed to read operator command");
                None
            }
        }
    }
}

/// Entries shown under a node, in display order.
enum Entry<'a> {
    Call(&'a TraceNode),
    Snapshot(&'a VariableSnapshot),
    Binding(&'a str, &'a str),
    Return(&'a str),
}

fn node_entries(node: &TraceNode) -> Vec<Entry<'_>> {
    let mut out: Vec<Entry<'_>> = node
        .children()
        .iter()
        .map(|child| match child {
            TraceChild::Call(call) => Entry::Call(call),
            TraceChild::Snapshot(snapshot) => Entry::Snapshot(snapshot),
        })
        .collect();
    if let Some(value) = node.return_value() {
        out.push(Entry::Return(value));
    }
    out
}

fn call_label(node: &TraceNode) -> String {
    style(format!("▶ Function Called: {}", node.label()))
        .cyan()
        .bold()
        .to_string()
}

/// Append `entries` below a node drawn with `prefix`, using tree guides.
fn push_entries(out: &mut String, prefix: &str, entries: &[Entry<'_>]) {
    for (i, entry) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let (branch, next) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        let child_prefix = format!("{prefix}{next}");

        out.push_str(prefix);
        out.push_str(&style(branch).dim().to_string());
        match entry {
            Entry::Call(node) => {
                out.push_str(&call_label(node));
                out.push('\n');
                push_entries(out, &child_prefix, &node_entries(node));
            }
            Entry::Snapshot(snapshot) => {
                let title = format!("Line {} in `{}`", snapshot.line(), snapshot.function());
                out.push_str(&style(title).blue().to_string());
                out.push('\n');
                let bindings: Vec<Entry<'_>> = snapshot
                    .iter()
                    .map(|(n, v)| Entry::Binding(n, v))
                    .collect();
                push_entries(out, &child_prefix, &bindings);
            }
            Entry::Binding(name, value) => {
                out.push_str(&format!("{}: {}\n", style(name).magenta(), style(value).yellow()));
            }
            Entry::Return(value) => {
                out.push_str(&format!("{} {value}\n", style("✔ Return:").green().bold()));
            }
        }
    }
}

impl<I: BufRead + Send, O: Write + Send> Renderer for ConsoleRenderer<I, O> {
    fn render_tree(&mut self, trace: &TreeTrace) {
        let mut out = call_label(&trace.root);
        out.push('\n');
        push_entries(&mut out, "", &node_entries(&trace.root));
        out.push_str(&format!(
            "\n{} {}\n",
            style("⏱ Execution Time:").yellow().bold(),
            style(trace.elapsed).yellow()
        ));
        self.emit(&out);
    }

    fn render_line(&mut self, line: u32, source: Option<&str>, snapshot: &VariableSnapshot) {
        let mut out = format!(
            "\n🔎 {} {}\n",
            style(format!("Executing Line {line}:")).yellow().bold(),
            source.unwrap_or("<source unavailable>")
        );
        if snapshot.is_empty() {
            out.push_str(&format!("{}\n", style("📭 No local variables yet.").dim()));
        } else {
            let mut table = Table::new(&["Variable", "Value"]);
            for (name, value) in snapshot.iter() {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            out.push_str(&format!("{}\n", style("📌 Local Variables").magenta().bold()));
            out.push_str(&table.render());
        }
        self.emit(&out);
    }

    fn render_pause_prompt(&mut self) -> BreakpointCommand {
        loop {
            let prompt = style(PROMPT).cyan().bold().to_string();
            self.emit(&prompt);
            match self.read_command() {
                Some(Ok(command)) => return command,
                Some(Err(unknown)) => {
                    let text = format!("{} `{unknown}`\n", style("Unknown command").red());
                    self.emit(&text);
                }
                None => {
                    self.emit("\n");
                    return BreakpointCommand::Resume;
                }
            }
        }
    }

    fn render_table(&mut self, title: &str, headers: &[&str], rows: &[Vec<String>]) {
        let mut alignments = vec![Alignment::Right; headers.len()];
        if let Some(first) = alignments.first_mut() {
            *first = Alignment::Left;
        }
        let mut table = Table::new(headers).with_alignments(&alignments);
        for row in rows {
            table.add_row(row.clone());
        }
        let out = format!("\n{}\n{}", style(title).bold(), table.render());
        self.emit(&out);
    }

    fn render_notice(&mut self, notice: Notice) {
        let text = match notice {
            Notice::BreakpointHit { line } => {
                format!("\n🛑 {}\n", style(format!("Breakpoint Hit at Line {line}")).red().bold())
            }
            Notice::Stopped => format!("{}\n", style("❌ Debugging Stopped.").red().bold()),
        };
        self.emit(&text);
    }
}
