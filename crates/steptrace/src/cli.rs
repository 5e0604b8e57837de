//! CLI definitions and argument types.

use clap::{Parser, Subcommand, ValueEnum};
use steptrace::FunctionMeta;
use steptrace::demo::{ADD, FIB, PIPELINE};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "steptrace")]
#[command(about = "Trace, step through and profile instrumented functions")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets the log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the call tree of a demo function
    Tree {
        /// Demo function to trace
        #[arg(long, value_enum, default_value = "sum")]
        demo: DemoArg,

        /// Input size
        #[arg(
            short,
            default_value = "5",
            value_parser = clap::value_parser!(u64).range(..=MAX_INPUT)
        )]
        n: u64,
    },
    /// Step through a demo function line by line
    Step {
        /// Demo function to step through
        #[arg(long, value_enum, default_value = "sum")]
        demo: DemoArg,

        /// Input size
        #[arg(
            short,
            default_value = "5",
            value_parser = clap::value_parser!(u64).range(..=MAX_INPUT)
        )]
        n: u64,

        /// Pause when this line is about to run (see `steptrace list`)
        #[arg(short, long)]
        breakpoint_line: Option<u32>,
    },
    /// Step through the async demo, which awaits a timer between lines
    StepAsync {
        /// Pause when this line is about to run (see `steptrace list`)
        #[arg(short, long)]
        breakpoint_line: Option<u32>,

        /// Simulated fetch delay in milliseconds
        #[arg(long, default_value = "200")]
        delay_ms: u64,
    },
    /// Report time spent per line of a demo function
    Profile {
        /// Demo function to profile
        #[arg(long, value_enum, default_value = "fib")]
        demo: DemoArg,

        /// Input size
        #[arg(
            short,
            default_value = "15",
            value_parser = clap::value_parser!(u64).range(..=MAX_INPUT)
        )]
        n: u64,
    },
    /// Print the demo sources with line numbers
    List,
}

/// Largest accepted `-n`; recursive demos grow exponentially.
pub const MAX_INPUT: u64 = 25;

/// Synchronous demo functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DemoArg {
    /// `add(n, 2n)`
    Sum,
    /// Recursive `fib(n)`
    Fib,
    /// `pipeline(n..1)`, following `normalize` and `add`
    Pipeline,
}

impl DemoArg {
    pub const fn meta(self) -> &'static FunctionMeta {
        match self {
            Self::Sum => &ADD,
            Self::Fib => &FIB,
            Self::Pipeline => &PIPELINE,
        }
    }
}
