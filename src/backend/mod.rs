//! The labeling backend: the calls the form makes, and the transports that
//! carry them.
//!
//! `Backend` is a blocking interface. The interactive session never calls it
//! directly; requests go through a [`Transport`] which hands back a
//! [`Ticket`] immediately and delivers a [`Completion`] later.

pub mod dispatch;
pub mod http;
pub mod local;

use serde_json::Value;

use crate::model::{Record, Schema, SchemaError};

pub use dispatch::{DispatchMode, Dispatcher};
pub use http::HttpBackend;
pub use local::{JsonlBackend, MemoryBackend};

/// Error type for backend calls
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("server returned {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {endpoint}: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
    #[error("item {index} is out of range (count {count})")]
    OutOfRange { index: usize, count: usize },
    #[error("update rejected: {0}")]
    Rejected(String),
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("invalid query: {0}")]
    Query(#[from] crate::ops::query::QueryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A page of items from `/render/`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    pub html: Vec<String>,
    pub items: Vec<Record>,
}

/// Blocking access to the labeling backend
pub trait Backend: Send + Sync {
    fn schema(&self) -> Result<Schema, BackendError>;
    fn count(&self) -> Result<usize, BackendError>;
    fn get(&self, index: usize) -> Result<Record, BackendError>;
    /// Persist one item. `payload` carries the annotation fields plus `_idx`.
    fn update(&self, payload: &Record) -> Result<(), BackendError>;
    fn autocomplete(&self, field: &str) -> Result<Vec<String>, BackendError>;
    /// Zero-based indices of items matching `query`, in backend order
    fn search(&self, query: &str) -> Result<Vec<usize>, BackendError>;
    fn render(&self, start: usize, count: usize) -> Result<Rendered, BackendError>;
}

/// A backend call that can be issued asynchronously
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Count,
    Get(usize),
    Update(Record),
    Autocomplete(String),
    Search(String),
}

/// The successful result of a [`Request`]
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Count(usize),
    Item(Record),
    Updated,
    Suggestions(Vec<String>),
    Matches(Vec<usize>),
}

/// Sequencing token for an issued request. Tickets increase monotonically
/// per transport, so a completion can always be matched to the request that
/// produced it and stale ones can be told apart.
pub type Ticket = u64;

/// Delivered once per submitted request
#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub result: Result<Reply, BackendError>,
}

/// Issues requests without waiting for them
pub trait Transport {
    fn submit(&mut self, request: Request) -> Ticket;
}

impl Request {
    /// Short name for logs
    pub fn endpoint(&self) -> &'static str {
        match self {
            Request::Count => "/count/",
            Request::Get(_) => "/get/",
            Request::Update(_) => "/update/",
            Request::Autocomplete(_) => "/autocomplete/",
            Request::Search(_) => "/search/",
        }
    }
}

/// Run a request against a backend, blocking
pub fn execute(backend: &dyn Backend, request: &Request) -> Result<Reply, BackendError> {
    match request {
        Request::Count => backend.count().map(Reply::Count),
        Request::Get(index) => backend.get(*index).map(Reply::Item),
        Request::Update(payload) => backend.update(payload).map(|_| Reply::Updated),
        Request::Autocomplete(field) => backend.autocomplete(field).map(Reply::Suggestions),
        Request::Search(query) => backend.search(query).map(Reply::Matches),
    }
}

/// Accept either a bare integer or `{"value": n}` for `/count/`
pub(crate) fn parse_count(value: &Value) -> Result<usize, BackendError> {
    let n = match value {
        Value::Number(n) => n.as_u64(),
        Value::Object(obj) => obj.get("value").and_then(Value::as_u64),
        _ => None,
    };
    n.map(|n| n as usize).ok_or_else(|| BackendError::Decode {
        endpoint: "/count/",
        message: format!("expected an integer, got {}", value),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records submitted requests; completions are fed back by hand so tests
    /// can deliver them late, out of order, or not at all.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        pub sent: Vec<(Ticket, Request)>,
        next: Ticket,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn last(&self) -> &(Ticket, Request) {
            self.sent.last().expect("no request was sent")
        }

        pub fn ok(ticket: Ticket, reply: Reply) -> Completion {
            Completion {
                ticket,
                result: Ok(reply),
            }
        }

        pub fn err(ticket: Ticket, message: &str) -> Completion {
            Completion {
                ticket,
                result: Err(BackendError::Rejected(message.to_string())),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn submit(&mut self, request: Request) -> Ticket {
            self.next += 1;
            self.sent.push((self.next, request));
            self.next
        }
    }
}
