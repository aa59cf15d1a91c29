use crate::executor::UnitId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("[{label}] unit {unit} is running on the reserved thread")]
    ReservedThreadViolation { label: String, unit: UnitId },

    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("worker panic: {0}")]
    WorkerPanic(String),

    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("{failed} unit(s) failed, last: {last}")]
    UnitsFailed { failed: usize, last: Box<Error> },
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn task_failed<S: Into<String>>(msg: S) -> Self {
        Error::TaskFailed(msg.into())
    }

    pub fn violation<S: Into<String>>(label: S, unit: UnitId) -> Self {
        Error::ReservedThreadViolation {
            label: label.into(),
            unit,
        }
    }

    /// True for a reserved-thread violation, directly or as the last error of a batch.
    pub fn is_violation(&self) -> bool {
        match self {
            Error::ReservedThreadViolation { .. } => true,
            Error::UnitsFailed { last, .. } => last.is_violation(),
            _ => false,
        }
    }
}
