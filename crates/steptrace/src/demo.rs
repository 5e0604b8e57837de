//! Instrumented demo functions used by the CLI and tests.
//!
//! Every function reports its lines with [`next_line!`], so the line
//! numbers in traces are lines of this file and the step debugger can show
//! their source.

use std::time::Duration;

use steptrace_hook::{Frame, FunctionMeta, locals, next_line, next_line_async};

/// Text of this file, attached to every demo's metadata.
pub const DEMO_SOURCE: &str = include_str!("demo.rs");

pub static ADD: FunctionMeta = FunctionMeta::new("add").with_source(DEMO_SOURCE);
pub static FIB: FunctionMeta = FunctionMeta::new("fib").with_source(DEMO_SOURCE);
pub static NORMALIZE: FunctionMeta = FunctionMeta::new("normalize").with_source(DEMO_SOURCE);
pub static PIPELINE: FunctionMeta = FunctionMeta::new("pipeline").with_source(DEMO_SOURCE);
pub static FETCH_TOTAL: FunctionMeta = FunctionMeta::new("fetch_total").with_source(DEMO_SOURCE);

/// All demos, in listing order.
pub static DEMOS: [&FunctionMeta; 5] = [&ADD, &FIB, &NORMALIZE, &PIPELINE, &FETCH_TOTAL];

pub fn add(x: i64, y: i64) -> i64 {
    let mut frame = Frame::enter(&ADD, &locals![x, y]);
    next_line!(frame, x, y);
    let z = x + y;
    next_line!(frame, x, y, z);
    frame.ret(z)
}

pub fn fib(n: u64) -> u64 {
    let mut frame = Frame::enter(&FIB, &locals![n]);
    next_line!(frame, n);
    if n < 2 {
        return frame.ret(n);
    }
    next_line!(frame, n);
    let value = fib(n - 1) + fib(n - 2);
    frame.ret(value)
}

/// Shift `values` so the smallest becomes zero.
pub fn normalize(values: &[i64]) -> Vec<i64> {
    let mut frame = Frame::enter(&NORMALIZE, &locals![values]);
    next_line!(frame, values);
    let floor = values.iter().copied().min().unwrap_or(0);
    next_line!(frame, values, floor);
    let shifted: Vec<i64> = values.iter().map(|v| v - floor).collect();
    frame.ret(shifted)
}

/// Normalize `values`, then sum them with [`add`].
pub fn pipeline(values: &[i64]) -> i64 {
    let mut frame = Frame::enter(&PIPELINE, &locals![values]);
    next_line!(frame, values);
    let normalized = normalize(values);
    next_line!(frame, values, normalized);
    let total = normalized.iter().fold(0, |acc, v| add(acc, *v));
    frame.ret(total)
}

/// Add two numbers after waiting `delay`, as if fetched remotely.
pub async fn fetch_total(a: i64, b: i64, delay: Duration) -> i64 {
    let mut frame = Frame::enter(&FETCH_TOTAL, &locals![a, b]);
    next_line_async!(frame, a, b).await;
    tokio::time::sleep(delay).await;
    next_line_async!(frame, a, b).await;
    let total = a + b;
    next_line_async!(frame, a, b, total).await;
    frame.ret(total)
}

/// Source of the demo `meta`, as `(line, text)` from its signature to its
/// closing brace.
pub fn listing(meta: &FunctionMeta) -> Option<Vec<(u32, &'static str)>> {
    let name = meta.name();
    let start = meta
        .find_line(&format!("pub fn {name}("))
        .or_else(|| meta.find_line(&format!("pub async fn {name}(")))?;
    let mut lines = Vec::new();
    let skip = usize::try_from(start - 1).ok()?;
    for (number, text) in (start..).zip(DEMO_SOURCE.lines().skip(skip)) {
        lines.push((number, text));
        if text == "}" {
            return Some(lines);
        }
    }
    None
}

/// Demo metadata by function name.
pub fn by_name(name: &str) -> Option<&'static FunctionMeta> {
    DEMOS.iter().copied().find(|meta| meta.name() == name)
}
