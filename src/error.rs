use thiserror::Error;

use crate::divide::Mode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DivideError {
    #[error("detail level {level} out of range (expected {min}..={max})")]
    InvalidDetailLevel { level: u32, min: u32, max: u32 },
    #[error("cannot step {requested:?} traversal: grid holds flags from an unfinished {active:?} run, reset first")]
    InconsistentState { requested: Mode, active: Mode },
    #[error("cannot start {requested:?} traversal: grid holds flags from a run this classifier did not start, reset first")]
    StaleFlags { requested: Mode },
}

pub type Result<T> = std::result::Result<T, DivideError>;
