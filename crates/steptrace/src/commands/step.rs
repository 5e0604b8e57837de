//! Step and step-async commands.

use std::time::Duration;

use steptrace::demo::{FETCH_TOTAL, fetch_total};
use steptrace::{ConsoleRenderer, FunctionMeta, StepConfig, StepDebugger, terminal};
use tracing::{error, info};

use super::call_demo;
use crate::cli::{DemoArg, EXIT_FAILURE, EXIT_SUCCESS};

fn config(meta: &FunctionMeta, breakpoint_line: Option<u32>) -> StepConfig {
    match breakpoint_line {
        Some(line) => {
            if meta.source_line(line).is_none_or(str::is_empty) {
                terminal::warning(&format!(
                    "line {line} is not part of the demo source; it will never pause"
                ));
            }
            StepConfig::default().with_breakpoint_line(line)
        }
        None => {
            terminal::info("no breakpoint set; pass --breakpoint-line (see `steptrace list`)");
            StepConfig::default()
        }
    }
}

/// Handle the `step` command.
pub fn cmd_step(demo: DemoArg, n: u64, breakpoint_line: Option<u32>) -> i32 {
    let meta = demo.meta();
    let debugger = StepDebugger::new(config(meta, breakpoint_line), ConsoleRenderer::stdio());

    info!(function = meta.name(), n, ?breakpoint_line, "stepping");
    match debugger.run(meta, || call_demo(demo, n)) {
        Ok(value) => {
            terminal::success(&format!("{} returned {value}", meta.name()));
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, function = meta.name(), "step session failed");
            EXIT_FAILURE
        }
    }
}

/// Handle the `step-async` command.
pub fn cmd_step_async(breakpoint_line: Option<u32>, delay_ms: u64) -> i32 {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return EXIT_FAILURE;
        }
    };

    let config = config(&FETCH_TOTAL, breakpoint_line);
    let debugger = StepDebugger::new(config, ConsoleRenderer::stdio());
    let future = fetch_total(5, 10, Duration::from_millis(delay_ms));

    info!(function = FETCH_TOTAL.name(), delay_ms, ?breakpoint_line, "stepping async");
    match runtime.block_on(debugger.run_async(&FETCH_TOTAL, future)) {
        Ok(value) => {
            terminal::success(&format!("{} returned {value}", FETCH_TOTAL.name()));
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, function = FETCH_TOTAL.name(), "async step session failed");
            EXIT_FAILURE
        }
    }
}
