//! Tree command.

use steptrace::demo::{ADD, NORMALIZE};
use steptrace::{ConsoleRenderer, TreeTracer, terminal};
use tracing::{error, info};

use super::call_demo;
use crate::cli::{DemoArg, EXIT_FAILURE, EXIT_SUCCESS};

/// Handle the `tree` command.
pub fn cmd_tree(demo: DemoArg, n: u64) -> i32 {
    let meta = demo.meta();
    let mut tracer = TreeTracer::new(ConsoleRenderer::stdio());
    if demo == DemoArg::Pipeline {
        tracer = tracer.follow(&NORMALIZE).follow(&ADD);
    }

    info!(function = meta.name(), n, "tracing call tree");
    match tracer.run(meta, || call_demo(demo, n)) {
        Ok(value) => {
            terminal::success(&format!("{} returned {value}", meta.name()));
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, function = meta.name(), "tree trace failed");
            EXIT_FAILURE
        }
    }
}
