//! Synchronous step sessions driven by scripted operator commands.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use steptrace::demo::{self, ADD, PIPELINE};
use steptrace::test_support::{ScriptedRenderer, panic_exit, serial};
use steptrace::{BreakpointCommand, Frame, FunctionMeta, Notice, StepConfig, StepDebugger, locals};

static COUNTDOWN: FunctionMeta = FunctionMeta::new("countdown");

/// Executable lines reported by `countdown`.
const LINES: u32 = 5;

fn countdown(start: u32) -> u32 {
    let mut frame = Frame::enter(&COUNTDOWN, &locals![start]);
    let mut left = start;
    for line in 1..=LINES {
        frame.line(line, &locals![start, left]);
        left = left.saturating_sub(1);
    }
    frame.ret(left)
}

fn debugger(breakpoint: u32, commands: &[BreakpointCommand]) -> StepDebugger<ScriptedRenderer> {
    let config = StepConfig::default()
        .with_breakpoint_line(breakpoint)
        .with_exit_hook(panic_exit);
    StepDebugger::new(config, ScriptedRenderer::with_commands(commands.iter().copied()))
}

#[test]
fn test_add_pauses_once_at_breakpoint() {
    let _guard = serial();
    let z_line = ADD.find_line("let z = x + y;").expect("demo source");
    let debugger = debugger(z_line, &[BreakpointCommand::Resume]);

    assert_eq!(debugger.run(&ADD, || demo::add(5, 10)).expect("run"), 15);
    assert_eq!(debugger.pauses(), 1);

    let renderer = debugger.renderer();
    assert_eq!(renderer.prompts, 1);
    assert_eq!(renderer.notices, vec![Notice::BreakpointHit { line: z_line }]);

    let (line, snapshot) = &renderer.lines[0];
    assert_eq!(*line, z_line);
    assert_eq!(snapshot.get("x"), Some("5"));
    assert_eq!(snapshot.get("y"), Some("10"));
    assert_eq!(snapshot.get("z"), None);
    assert_eq!(renderer.sources[0].as_deref(), Some("let z = x + y;"));
    // The line after the pause is still shown.
    assert_eq!(renderer.lines.len(), 2);
}

#[test]
fn test_advance_steps_to_completion() {
    let _guard = serial();
    let script = vec![BreakpointCommand::Advance; LINES as usize];
    for breakpoint in 1..=LINES {
        let debugger = debugger(breakpoint, &script);
        assert_eq!(debugger.run(&COUNTDOWN, || countdown(9)).expect("run"), 4);

        let index = breakpoint - 1;
        let renderer = debugger.renderer();
        assert_eq!(renderer.prompts, (LINES - index) as usize, "breakpoint {breakpoint}");
        assert_eq!(renderer.commands.len(), index as usize);
        assert_eq!(renderer.notices, vec![Notice::BreakpointHit { line: breakpoint }]);
    }
}

#[test]
fn test_resume_runs_without_further_pauses() {
    let _guard = serial();
    let debugger = debugger(2, &[BreakpointCommand::Resume, BreakpointCommand::Abort]);
    assert_eq!(debugger.run(&COUNTDOWN, || countdown(3)).expect("run"), 0);

    let renderer = debugger.renderer();
    assert_eq!(renderer.prompts, 1);
    assert_eq!(renderer.lines.len(), LINES as usize);
    assert_eq!(renderer.commands.len(), 1);
}

#[test]
fn test_no_breakpoint_only_shows_lines() {
    let _guard = serial();
    let debugger = StepDebugger::new(StepConfig::default(), ScriptedRenderer::default());
    assert_eq!(debugger.run(&COUNTDOWN, || countdown(1)).expect("run"), 0);

    let renderer = debugger.renderer();
    assert_eq!(renderer.prompts, 0);
    let lines: Vec<u32> = renderer.lines.iter().map(|(line, _)| *line).collect();
    assert_eq!(lines, (1..=LINES).collect::<Vec<_>>());
    assert_eq!(renderer.lines[1].1.get("left"), Some("0"));
}

#[test]
fn test_abort_never_returns() {
    let _guard = serial();
    let z_line = ADD.find_line("let z = x + y;").expect("demo source");
    let debugger = debugger(z_line, &[BreakpointCommand::Abort]);
    let returned = AtomicBool::new(false);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let value = debugger.run(&ADD, || demo::add(5, 10));
        returned.store(true, Ordering::SeqCst);
        value
    }));

    let payload = result.expect_err("abort must not return");
    assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("exit(0)"));
    assert!(!returned.load(Ordering::SeqCst));
    {
        let renderer = debugger.renderer();
        assert_eq!(renderer.notices.last(), Some(&Notice::Stopped));
        // Nothing after the aborted line ran.
        assert_eq!(renderer.lines.len(), 1);
    }

    // The aborted session no longer holds the router.
    let again = StepDebugger::new(StepConfig::default(), ScriptedRenderer::default());
    assert_eq!(again.run(&ADD, || demo::add(1, 2)).expect("fresh session"), 3);
}

#[test]
fn test_only_target_lines_are_stepped() {
    let _guard = serial();
    let debugger = StepDebugger::new(StepConfig::default(), ScriptedRenderer::default());
    assert_eq!(debugger.run(&PIPELINE, || demo::pipeline(&[4, 6])).expect("run"), 2);

    let renderer = debugger.renderer();
    assert_eq!(renderer.lines.len(), 2);
    assert!(renderer.lines.iter().all(|(_, snapshot)| snapshot.function() == "pipeline"));
}
