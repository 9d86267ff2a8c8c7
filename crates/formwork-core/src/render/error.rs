use thiserror::Error;

use crate::data_source::DataSourceError;
use crate::schema::SchemaNode;

/// Errors a renderer may return
///
/// The schema renderer turns these into an [`Output::Error`](super::Output::Error)
/// for the failing subtree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("no data source available")]
    NoDataSource,

    #[error(transparent)]
    Data(#[from] DataSourceError),

    #[error("expected a '{expected}' node, found '{found}'")]
    SchemaMismatch { expected: String, found: String },

    #[error("invalid '{type_name}' node: {message}")]
    InvalidSchema { type_name: String, message: String },

    #[error("{0}")]
    Custom(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

impl RenderError {
    /// Error for a renderer handed a node of the wrong kind
    ///
    /// A passthrough node that fell back from `expected` because its fields
    /// did not parse reports the parse failure instead.
    pub fn mismatch(expected: &str, node: &SchemaNode) -> Self {
        if let SchemaNode::Unknown(unknown) = node {
            if let Some(parse_error) = &unknown.parse_error {
                return Self::InvalidSchema {
                    type_name: unknown.type_name.clone(),
                    message: parse_error.clone(),
                };
            }
        }
        Self::SchemaMismatch {
            expected: expected.to_string(),
            found: node.type_name().to_string(),
        }
    }

    pub fn invalid(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }
}
