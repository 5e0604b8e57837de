//! Per-line wall-time profiling.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use steptrace_hook::{self as hook, Directive, Filter, FrameEvent, FrameHandler, FunctionMeta};

use crate::Result;
use crate::metrics::{self, SessionMode};
use crate::render::Renderer;
use crate::timing::{Elapsed, Stopwatch};

/// Accumulated cost of one source line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineStat {
    pub hits: u64,
    pub time: Duration,
}

/// Line costs of one profiled call.
#[derive(Clone, Debug)]
pub struct LineProfile {
    pub function: &'static str,
    /// Sorted by line number.
    pub lines: Vec<(u32, LineStat)>,
    pub elapsed: Elapsed,
}

impl LineProfile {
    pub fn get(&self, line: u32) -> Option<&LineStat> {
        self.lines
            .binary_search_by_key(&line, |(l, _)| *l)
            .ok()
            .map(|i| &self.lines[i].1)
    }

    /// Line events seen, over all lines.
    pub fn total_hits(&self) -> u64 {
        self.lines.iter().map(|(_, stat)| stat.hits).sum()
    }
}

/// Charges wall time to the line each open invocation is executing.
///
/// Every invocation keeps its own open line. A nested call pauses the
/// caller's line and its return resumes it, so recursive targets keep the
/// caller's time after the callee returns.
#[derive(Debug, Default)]
struct LineClock {
    /// Open line per invocation, innermost last.
    frames: Vec<Option<u32>>,
    since: Option<Instant>,
    stats: BTreeMap<u32, LineStat>,
}

impl LineClock {
    /// Charge the time since the last event to the innermost open line.
    fn charge(&mut self, now: Instant) {
        if let (Some(Some(line)), Some(since)) = (self.frames.last(), self.since) {
            self.stats.entry(*line).or_default().time += now.duration_since(since);
        }
        self.since = Some(now);
    }

    fn record(&mut self, event: &FrameEvent<'_>, now: Instant) {
        self.charge(now);
        match event {
            FrameEvent::Call { .. } => self.frames.push(None),
            FrameEvent::Line { line, .. } => {
                self.stats.entry(*line).or_default().hits += 1;
                match self.frames.last_mut() {
                    Some(open) => *open = Some(*line),
                    None => self.frames.push(Some(*line)),
                }
            }
            FrameEvent::Return { .. } => {
                self.frames.pop();
            }
        }
    }
}

impl FrameHandler for LineClock {
    fn handle(
        &mut self,
        _meta: &'static FunctionMeta,
        event: &FrameEvent<'_>,
    ) -> hook::Result<Directive> {
        self.record(event, Instant::now());
        Ok(Directive::Continue)
    }
}

/// Profiles a traced call line by line and renders the report as tables.
pub struct LineProfiler<R> {
    renderer: Mutex<R>,
}

impl<R: Renderer> LineProfiler<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer: Mutex::new(renderer),
        }
    }

    pub fn renderer(&self) -> MutexGuard<'_, R> {
        self.renderer.lock()
    }

    /// Profile `call` without rendering.
    pub fn profile<T>(
        &self,
        meta: &'static FunctionMeta,
        call: impl FnOnce() -> T,
    ) -> Result<(T, LineProfile)> {
        let filter = Filter::only(meta);
        let mut session = hook::subscribe(meta, filter, LineClock::default(), std::process::exit)?;

        let stopwatch = Stopwatch::start();
        let value = call();
        let elapsed = stopwatch.elapsed();

        let stats = session.finish()?;
        metrics::record_session(SessionMode::Profile, &stats, elapsed);

        let clock = std::mem::take(&mut *session.handler());
        let profile = LineProfile {
            function: meta.name(),
            lines: clock.stats.into_iter().collect(),
            elapsed,
        };
        Ok((value, profile))
    }

    /// Profile `call`, render its report and return its value.
    pub fn run<T>(&self, meta: &'static FunctionMeta, call: impl FnOnce() -> T) -> Result<T> {
        let (value, profile) = self.profile(meta, call)?;

        let summary = [
            vec!["Execution Time".to_string(), profile.elapsed.to_string()],
            vec!["Lines Executed".to_string(), profile.total_hits().to_string()],
            vec!["Distinct Lines".to_string(), profile.lines.len().to_string()],
        ];
        let lines: Vec<Vec<String>> = profile
            .lines
            .iter()
            .map(|(line, stat)| {
                vec![
                    line.to_string(),
                    stat.hits.to_string(),
                    format!("{:.3}", Elapsed::new(stat.time).as_millis_f64()),
                    meta.source_line(*line).unwrap_or_default().to_string(),
                ]
            })
            .collect();

        let mut renderer = self.renderer.lock();
        renderer.render_table(
            &format!("⚡ Profiling Report: {}", profile.function),
            &["Metric", "Value"],
            &summary,
        );
        if !lines.is_empty() {
            renderer.render_table(
                &format!("📊 Line Execution Times: {}", profile.function),
                &["Line", "Hits", "Time (ms)", "Source"],
                &lines,
            );
        }
        Ok(value)
    }
}
