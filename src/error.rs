use thiserror::Error;

/// Failure reported by a [`crate::probe::Notifier`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification {id} failed: {reason}")]
pub struct NotifyError {
    pub id: String,
    pub reason: String,
}

impl NotifyError {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// Caller tried to start a probe while the active table is full.
    #[error("probe limit reached: {active} active, limit {limit}")]
    ConcurrencyLimit { active: usize, limit: usize },

    #[error("no active probe with id {0}")]
    UnknownProbe(String),

    /// The notification collaborator refused the probe's progress notice;
    /// the probe was not registered.
    #[error(transparent)]
    Notification(#[from] NotifyError),
}
