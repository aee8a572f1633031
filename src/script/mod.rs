//! Response handler execution.
//!
//! Handlers see a frozen `response` object, a `console`, and a `client` with
//! `log`, `test` and `assert`. Tests registered with `client.test` run after
//! the handler body, in registration order, and each produces `RUN:` plus
//! either `PASS:` or `FAILED:` and the error text on the console.

mod js;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ScriptError;
use crate::transport::ResponseRecord;

pub use js::JsRuntime;

/// What a handler can see of the HTTP response.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseView {
    pub status: u16,
    pub body: String,
    pub headers: IndexMap<String, String>,
    pub content_type: Option<String>,
}

impl ResponseView {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }
}

impl From<&ResponseRecord> for ResponseView {
    fn from(response: &ResponseRecord) -> Self {
        let mut headers: IndexMap<String, String> = IndexMap::new();
        for (name, value) in response.headers.iter() {
            let value = String::from_utf8_lossy(value.as_bytes());
            headers
                .entry(name.as_str().to_string())
                .and_modify(|joined| {
                    joined.push_str(", ");
                    joined.push_str(&value);
                })
                .or_insert_with(|| value.to_string());
        }
        let content_type = headers.get("content-type").cloned();
        Self {
            status: response.status.as_u16(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
            headers,
            content_type,
        }
    }
}

/// Console text and failed test messages from one handler run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandlerResult {
    pub console: String,
    pub failures: Vec<String>,
}

impl HandlerResult {
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Runs handler source against a response. Every call gets a fresh context.
pub trait ScriptRuntime: Send + Sync {
    fn run(&self, source: &str, response: &ResponseView) -> Result<HandlerResult, ScriptError>;
}
