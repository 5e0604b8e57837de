use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};
use steptrace_hook::{
    self as hook, Directive, Filter, FrameEvent, FrameHandler, FunctionMeta, HookError,
    VariableSnapshot, Verdict,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use super::StepConfig;
use super::controller::{StepController, show_line, step_line};
use crate::metrics::{self, SessionMode};
use crate::render::Renderer;
use crate::timing::Stopwatch;
use crate::{Error, Result};

/// Prompts from inside the router, on the thread running the traced call.
struct SyncStepper<R> {
    controller: StepController,
    renderer: Arc<Mutex<R>>,
}

impl<R: Renderer> FrameHandler for SyncStepper<R> {
    fn handle(
        &mut self,
        meta: &'static FunctionMeta,
        event: &FrameEvent<'_>,
    ) -> hook::Result<Directive> {
        let FrameEvent::Line { line, locals, .. } = event else {
            return Ok(Directive::Continue);
        };
        let snapshot = VariableSnapshot::capture(meta, *line, locals);
        let verdict = step_line(&mut self.controller, &mut *self.renderer.lock(), meta, &snapshot);
        Ok(match verdict {
            Verdict::Continue => Directive::Continue,
            Verdict::Abort => Directive::Abort,
        })
    }
}

/// One line event handed to the async controller task. Lines that cannot
/// pause carry no reply and are only shown.
struct LineRequest {
    meta: &'static FunctionMeta,
    snapshot: VariableSnapshot,
    reply: Option<oneshot::Sender<Verdict>>,
}

/// Forwards line events of an async session to its controller task.
struct LineForwarder {
    tx: mpsc::UnboundedSender<LineRequest>,
}

impl FrameHandler for LineForwarder {
    fn handle(
        &mut self,
        meta: &'static FunctionMeta,
        event: &FrameEvent<'_>,
    ) -> hook::Result<Directive> {
        let FrameEvent::Line {
            line,
            locals,
            pausable,
        } = event
        else {
            return Ok(Directive::Continue);
        };
        let snapshot = VariableSnapshot::capture(meta, *line, locals);
        if !pausable {
            debug!(function = meta.name(), line, "showing line that cannot pause");
            let request = LineRequest {
                meta,
                snapshot,
                reply: None,
            };
            self.tx.send(request).map_err(|_| HookError::ControllerClosed)?;
            return Ok(Directive::Continue);
        }

        let (reply, gate) = oneshot::channel();
        let request = LineRequest {
            meta,
            snapshot,
            reply: Some(reply),
        };
        self.tx.send(request).map_err(|_| HookError::ControllerClosed)?;
        Ok(Directive::Await(gate))
    }
}

/// Owns the controller of an async session until every sender is gone.
///
/// Prompts run on the blocking pool; the controller moves in and back out
/// of each prompt.
async fn control<R>(
    mut rx: mpsc::UnboundedReceiver<LineRequest>,
    mut controller: StepController,
    renderer: Arc<Mutex<R>>,
) -> std::result::Result<StepController, tokio::task::JoinError>
where
    R: Renderer + 'static,
{
    while let Some(LineRequest {
        meta,
        snapshot,
        reply,
    }) = rx.recv().await
    {
        let Some(reply) = reply else {
            show_line(&mut *renderer.lock(), meta, &snapshot);
            continue;
        };
        let renderer = Arc::clone(&renderer);
        let mut current = controller;
        let (next, verdict) = tokio::task::spawn_blocking(move || {
            let verdict = step_line(&mut current, &mut *renderer.lock(), meta, &snapshot);
            (current, verdict)
        })
        .await
        .inspect_err(|err| error!(error = %err, "step prompt failed"))?;

        controller = next;
        if reply.send(verdict).is_err() {
            debug!(function = meta.name(), "traced future dropped before its verdict");
        }
    }
    Ok(controller)
}

/// Runs a traced call under an interactive step session.
///
/// ```no_run
/// use steptrace::{ConsoleRenderer, StepConfig, StepDebugger};
/// use steptrace::demo::{self, ADD};
///
/// let config = StepConfig::default().with_breakpoint_line(12);
/// let debugger = StepDebugger::new(config, ConsoleRenderer::stdio());
/// let sum = debugger.run(&ADD, || demo::add(5, 10))?;
/// # Ok::<(), steptrace::Error>(())
/// ```
pub struct StepDebugger<R> {
    config: StepConfig,
    renderer: Arc<Mutex<R>>,
    pauses: AtomicUsize,
}

impl<R: Renderer + 'static> StepDebugger<R> {
    pub fn new(config: StepConfig, renderer: R) -> Self {
        Self {
            config,
            renderer: Arc::new(Mutex::new(renderer)),
            pauses: AtomicUsize::new(0),
        }
    }

    pub const fn config(&self) -> &StepConfig {
        &self.config
    }

    pub fn renderer(&self) -> MutexGuard<'_, R> {
        self.renderer.lock()
    }

    /// Pauses entered across all sessions of this debugger.
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::Relaxed)
    }

    fn conclude(&self, mode: SessionMode, controller: &mut StepController) {
        controller.finish();
        let pauses = controller.pauses();
        self.pauses.fetch_add(pauses, Ordering::Relaxed);
        metrics::record_pauses(pauses);
        debug!(mode = mode.as_str(), pauses, "step session complete");
    }

    /// Step through a synchronous call.
    ///
    /// Prompts block the calling thread. If the operator aborts, the
    /// configured exit hook runs and this never returns.
    pub fn run<T>(&self, meta: &'static FunctionMeta, call: impl FnOnce() -> T) -> Result<T> {
        let handler = SyncStepper {
            controller: StepController::new(self.config.breakpoint_line),
            renderer: Arc::clone(&self.renderer),
        };
        let mut session = hook::subscribe(meta, Filter::only(meta), handler, self.config.exit)?;

        let stopwatch = Stopwatch::start();
        let value = call();
        let elapsed = stopwatch.elapsed();

        let stats = session.finish()?;
        self.conclude(SessionMode::Step, &mut session.handler().controller);
        metrics::record_session(SessionMode::Step, &stats, elapsed);
        Ok(value)
    }

    /// Step through an async call.
    ///
    /// Must be awaited inside a tokio runtime. Each line event of the
    /// target suspends the future until the controller task answers it.
    pub async fn run_async<F>(&self, meta: &'static FunctionMeta, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = LineForwarder { tx };
        let mut session = hook::subscribe(meta, Filter::only(meta), forwarder, self.config.exit)?;
        let controller = tokio::spawn(control(
            rx,
            StepController::new(self.config.breakpoint_line),
            Arc::clone(&self.renderer),
        ));

        let stopwatch = Stopwatch::start();
        let value = future.await;
        let elapsed = stopwatch.elapsed();

        let stats = session.finish();
        // Closes the channel so the controller task can finish.
        drop(session);
        let mut controller = controller
            .await
            .map_err(|err| Error::ControllerTask(err.to_string()))?
            .map_err(|err| Error::ControllerTask(err.to_string()))?;

        let stats = stats?;
        self.conclude(SessionMode::StepAsync, &mut controller);
        metrics::record_session(SessionMode::StepAsync, &stats, elapsed);
        Ok(value)
    }
}
