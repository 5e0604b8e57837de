//! List command.

use console::style;
use steptrace::demo::{self, DEMOS};
use tracing::warn;

use crate::cli::EXIT_SUCCESS;

/// Handle the `list` command.
pub fn cmd_list() -> i32 {
    for meta in DEMOS {
        let Some(lines) = demo::listing(meta) else {
            warn!(function = meta.name(), "demo source not found");
            continue;
        };
        println!("\n{}", style(meta.name()).bold());
        for (number, text) in lines {
            println!("{} {text}", style(format!("{number:>4} │")).dim());
        }
    }
    EXIT_SUCCESS
}
