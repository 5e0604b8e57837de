use thiserror::Error;

/// Router and frame-event errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("trace session for `{active}` is already active; cannot start one for `{requested}`")]
    SessionActive {
        active: &'static str,
        requested: &'static str,
    },

    #[error("return event for `{function}` with an empty call stack")]
    StackUnderflow {
        function: &'static str,
    },

    #[error("step controller hung up")]
    ControllerClosed,
}

pub type Result<T> = std::result::Result<T, HookError>;
