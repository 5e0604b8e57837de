//! Profile command.

use steptrace::{ConsoleRenderer, LineProfiler, terminal};
use tracing::{error, info};

use super::call_demo;
use crate::cli::{DemoArg, EXIT_FAILURE, EXIT_SUCCESS};

/// Handle the `profile` command.
pub fn cmd_profile(demo: DemoArg, n: u64) -> i32 {
    let meta = demo.meta();
    let profiler = LineProfiler::new(ConsoleRenderer::stdio());

    info!(function = meta.name(), n, "profiling");
    match profiler.run(meta, || call_demo(demo, n)) {
        Ok(value) => {
            terminal::success(&format!("{} returned {value}", meta.name()));
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, function = meta.name(), "profile failed");
            EXIT_FAILURE
        }
    }
}
