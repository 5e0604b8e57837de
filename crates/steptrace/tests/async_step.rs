//! Async step sessions: the controller runs as a task and the traced future
//! suspends at each line until it answers.

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use steptrace::demo::{FETCH_TOTAL, fetch_total};
use steptrace::test_support::{ScriptedRenderer, panic_exit, serial};
use steptrace::{
    BreakpointCommand, Frame, FunctionMeta, Notice, Renderer, StepConfig, StepDebugger, TreeTrace,
    VariableSnapshot, locals,
};
use tokio::sync::mpsc;

const DELAY: Duration = Duration::from_millis(20);

fn line_of(needle: &str) -> u32 {
    FETCH_TOTAL.find_line(needle).expect("demo source")
}

#[tokio::test]
async fn test_async_pause_and_resume() {
    let _guard = serial();
    let total_line = line_of("let total = a + b;");
    let config = StepConfig::default().with_breakpoint_line(total_line);
    let renderer = ScriptedRenderer::with_commands([BreakpointCommand::Resume]);
    let debugger = StepDebugger::new(config, renderer);

    let total = debugger
        .run_async(&FETCH_TOTAL, fetch_total(5, 10, DELAY))
        .await
        .expect("run");
    assert_eq!(total, 15);
    assert_eq!(debugger.pauses(), 1);

    let renderer = debugger.renderer();
    assert_eq!(renderer.prompts, 1);
    assert_eq!(renderer.notices, vec![Notice::BreakpointHit { line: total_line }]);
    assert_eq!(renderer.lines.len(), 3);
    let (_, at_pause) = &renderer.lines[1];
    assert_eq!(at_pause.get("a"), Some("5"));
    assert_eq!(at_pause.get("total"), None);
    let (_, last) = &renderer.lines[2];
    assert_eq!(last.get("total"), Some("15"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_advance_survives_suspension() {
    let _guard = serial();
    let first = line_of("tokio::time::sleep(delay).await;");
    let config = StepConfig::default().with_breakpoint_line(first);
    let script = [BreakpointCommand::Advance; 3];
    let debugger = StepDebugger::new(config, ScriptedRenderer::with_commands(script));

    let total = debugger
        .run_async(&FETCH_TOTAL, fetch_total(1, 2, DELAY))
        .await
        .expect("run");
    assert_eq!(total, 3);
    assert_eq!(debugger.pauses(), 3);
    assert!(debugger.renderer().commands.is_empty());
}

#[tokio::test]
async fn test_async_abort_never_returns() {
    let _guard = serial();
    let config = StepConfig::default()
        .with_breakpoint_line(line_of("tokio::time::sleep(delay).await;"))
        .with_exit_hook(panic_exit);
    let debugger = Arc::new(StepDebugger::new(
        config,
        ScriptedRenderer::with_commands([BreakpointCommand::Abort]),
    ));

    let task = {
        let debugger = Arc::clone(&debugger);
        tokio::spawn(async move {
            debugger
                .run_async(&FETCH_TOTAL, fetch_total(5, 10, DELAY))
                .await
        })
    };
    let err = task.await.expect_err("abort must not return");
    assert!(err.is_panic());
    assert_eq!(debugger.renderer().notices.last(), Some(&Notice::Stopped));

    // The router is free again.
    let again = StepDebugger::new(StepConfig::default(), ScriptedRenderer::default());
    let total = again
        .run_async(&FETCH_TOTAL, fetch_total(2, 2, Duration::ZERO))
        .await
        .expect("fresh session");
    assert_eq!(total, 4);
}

static MIXED: FunctionMeta = FunctionMeta::new("mixed");

/// Async function that reports its first line through the synchronous
/// `Frame::line`.
async fn mixed(x: u32) -> u32 {
    let mut frame = Frame::enter(&MIXED, &locals![x]);
    tokio::task::yield_now().await;
    frame.line(1, &locals![x]);
    let y = x + 1;
    let gate = frame.line_async(2, &locals![x, y]);
    gate.await;
    frame.ret(y)
}

fn mixed_debugger(commands: &[BreakpointCommand]) -> Arc<StepDebugger<ScriptedRenderer>> {
    let config = StepConfig::default()
        .with_breakpoint_line(1)
        .with_exit_hook(panic_exit);
    let renderer = ScriptedRenderer::with_commands(commands.iter().copied());
    Arc::new(StepDebugger::new(config, renderer))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_line_in_async_session_honours_abort() {
    let _guard = serial();
    let debugger = mixed_debugger(&[BreakpointCommand::Abort]);

    let task = {
        let debugger = Arc::clone(&debugger);
        tokio::spawn(async move { debugger.run_async(&MIXED, mixed(1)).await })
    };
    let err = task.await.expect_err("abort must not return");
    assert!(err.is_panic());

    let renderer = debugger.renderer();
    assert_eq!(renderer.prompts, 1);
    assert_eq!(renderer.notices.last(), Some(&Notice::Stopped));
    // Line 2 never ran.
    assert_eq!(renderer.lines.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_line_in_async_session_pauses() {
    let _guard = serial();
    let debugger = mixed_debugger(&[BreakpointCommand::Advance]);

    assert_eq!(debugger.run_async(&MIXED, mixed(1)).await.expect("run"), 2);
    assert_eq!(debugger.pauses(), 2);
    let lines: Vec<u32> = debugger.renderer().lines.iter().map(|(line, _)| *line).collect();
    assert_eq!(lines, vec![1, 2]);
}

#[tokio::test]
async fn test_sync_line_on_current_thread_is_shown_without_pausing() {
    let _guard = serial();
    let debugger = mixed_debugger(&[BreakpointCommand::Abort]);

    assert_eq!(debugger.run_async(&MIXED, mixed(4)).await.expect("run"), 5);
    let renderer = debugger.renderer();
    assert_eq!(renderer.prompts, 0);
    assert!(renderer.notices.is_empty());
    assert_eq!(renderer.lines.len(), 2);
    assert_eq!(renderer.lines[0].1.get("x"), Some("4"));
    assert_eq!(renderer.commands.len(), 1);
}

/// Blocks each prompt until the test sends a command.
struct GatedRenderer {
    paused: mpsc::UnboundedSender<u32>,
    commands: std_mpsc::Receiver<BreakpointCommand>,
    last_line: u32,
}

impl Renderer for GatedRenderer {
    fn render_tree(&mut self, _trace: &TreeTrace) {}

    fn render_line(&mut self, line: u32, _source: Option<&str>, _snapshot: &VariableSnapshot) {
        self.last_line = line;
    }

    fn render_pause_prompt(&mut self) -> BreakpointCommand {
        let _ = self.paused.send(self.last_line);
        self.commands.recv().unwrap_or(BreakpointCommand::Resume)
    }

    fn render_table(&mut self, _title: &str, _headers: &[&str], _rows: &[Vec<String>]) {}
}

#[tokio::test]
async fn test_paused_session_does_not_block_scheduler() {
    let _guard = serial();
    let (paused_tx, mut paused_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = std_mpsc::channel();
    let renderer = GatedRenderer {
        paused: paused_tx,
        commands: command_rx,
        last_line: 0,
    };
    let first = line_of("tokio::time::sleep(delay).await;");
    let debugger = Arc::new(StepDebugger::new(
        StepConfig::default().with_breakpoint_line(first),
        renderer,
    ));

    let session = {
        let debugger = Arc::clone(&debugger);
        tokio::spawn(async move {
            debugger
                .run_async(&FETCH_TOTAL, fetch_total(20, 22, Duration::ZERO))
                .await
        })
    };

    assert_eq!(paused_rx.recv().await, Some(first));
    // Other tasks keep running on this single-threaded runtime while paused.
    let other = tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        7
    });
    assert_eq!(other.await.expect("unrelated task"), 7);
    assert!(!session.is_finished());

    command_tx.send(BreakpointCommand::Resume).expect("send command");
    let total = session.await.expect("session task").expect("run");
    assert_eq!(total, 42);
    assert_eq!(debugger.pauses(), 1);
}
