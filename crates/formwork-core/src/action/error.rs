use thiserror::Error;

use crate::data_source::DataSourceError;

/// Errors raised by action handlers
///
/// The runner never returns these; they are folded into a failed
/// [`ActionResult`](super::ActionResult).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("missing parameter '{0}'")]
    MissingParam(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("no data source available")]
    NoDataSource,

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error("{0}")]
    Handler(String),
}

pub type ActionOutcome = Result<super::ActionResult, ActionError>;

impl ActionError {
    pub fn handler<S: Into<String>>(msg: S) -> Self {
        Self::Handler(msg.into())
    }

    pub fn invalid_param(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
