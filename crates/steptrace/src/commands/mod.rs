//! Command implementations.
//!
//! Each submodule handles one CLI command.

mod list;
mod profile;
mod step;
mod tree;

use steptrace::demo;

use crate::cli::{Cli, Commands, DemoArg};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Tree { demo, n } => tree::cmd_tree(*demo, *n),
        Commands::Step {
            demo,
            n,
            breakpoint_line,
        } => step::cmd_step(*demo, *n, *breakpoint_line),
        Commands::StepAsync {
            breakpoint_line,
            delay_ms,
        } => step::cmd_step_async(*breakpoint_line, *delay_ms),
        Commands::Profile { demo, n } => profile::cmd_profile(*demo, *n),
        Commands::List => list::cmd_list(),
    }
}

/// Call the demo with input size `n` and render its result.
fn call_demo(which: DemoArg, n: u64) -> String {
    let signed = i64::try_from(n).unwrap_or(i64::MAX);
    match which {
        DemoArg::Sum => demo::add(signed, signed * 2).to_string(),
        DemoArg::Fib => demo::fib(n).to_string(),
        DemoArg::Pipeline => {
            let values: Vec<i64> = (1..=signed).rev().collect();
            demo::pipeline(&values).to_string()
        }
    }
}
