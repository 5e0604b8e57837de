//! Shared helpers for router tests.

use parking_lot::{Mutex, MutexGuard};
use steptrace_frame::{FunctionMeta, render_value};

use crate::{Directive, FrameEvent, FrameHandler, HookError, Result};

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

/// Serialise tests that touch the process-wide router.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock()
}

/// Exit hook that panics instead of ending the test process.
pub fn panic_exit(code: i32) -> ! {
    panic!("exit({code})")
}

/// Handler that records a compact description of every event.
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<String>,
    pub fail_on_line: Option<u32>,
    pub abort_on_line: Option<u32>,
}

impl FrameHandler for Recorder {
    fn handle(&mut self, meta: &'static FunctionMeta, event: &FrameEvent<'_>) -> Result<Directive> {
        match event {
            FrameEvent::Call { .. } => self.events.push(format!("call {}", meta.name())),
            FrameEvent::Line { line, .. } => {
                if self.fail_on_line == Some(*line) {
                    return Err(HookError::StackUnderflow {
                        function: meta.name(),
                    });
                }
                self.events.push(format!("line {}:{line}", meta.name()));
                if self.abort_on_line == Some(*line) {
                    return Ok(Directive::Abort);
                }
            }
            FrameEvent::Return { value: Some(value) } => {
                self.events
                    .push(format!("return {}={}", meta.name(), render_value(*value)));
            }
            FrameEvent::Return { value: None } => {
                self.events.push(format!("return {}", meta.name()));
            }
        }
        Ok(Directive::Continue)
    }
}
