use serde::{Deserialize, Serialize};

/// Successful response of the books endpoint.
///
/// `T` is `serde_json::Value` on the proxy side, where rows are relayed untouched, and
/// [`Book`](super::book::Book) once a client has decoded them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooksPage<T> {
    pub data:   Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit:  Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total:  Option<u64>,
}

/// Failure response of the books endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error:   String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error:   error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<serde_json::Value>) -> Self {
        self.details = Some(details.into());
        self
    }
}
