use steptrace_hook::HookError;
use thiserror::Error;

/// Tracing session errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("trace hook error: {0}")]
    Hook(#[from] HookError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("step controller task failed: {0}")]
    ControllerTask(String),
}

pub type Result<T> = std::result::Result<T, Error>;
