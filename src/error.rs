use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::player::Report;
use crate::scanner::Token;

/// Errors raised while turning recipe text into steps.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to make steps: {0:?}")]
    Lexical(String),

    #[error("request separator is missing ({0})")]
    MissingSeparator(&'static str),

    #[error("method is missing")]
    MissingMethod,

    #[error("failed to declare response handler for invalid request")]
    HandlerWithoutRequest,

    #[error("missing handler context")]
    MissingHandlerContext,

    #[error("invalid script")]
    InvalidScript,

    #[error("response handler has no script")]
    EmptyHandler,

    #[error("unexpected token: {0}")]
    UnexpectedToken(Token),

    #[error("failed to read recipe {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("unsupported url scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("url has no host: {0}")]
    MissingHost(String),

    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("request failed: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    /// The handler source threw or failed to compile.
    #[error("{message}")]
    Handler { message: String, console: String },

    /// The runtime itself could not be prepared or read back.
    #[error("script engine error: {0}")]
    Engine(String),
}

/// Fatal errors that stop a play.
#[derive(Debug, Error)]
pub enum PlayError {
    #[error("step {step:?}: invalid url {url:?}: {source}")]
    InvalidUrl {
        step: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("step {step:?}: invalid method {method:?}")]
    InvalidMethod { step: String, method: String },

    #[error("step {step:?}: {source}")]
    Transport {
        step: String,
        #[source]
        source: TransportError,
    },

    #[error("step {step:?}: failed to load handler {path}: {source}")]
    HandlerFile {
        step: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("step {step:?}: response handler failed: {source}")]
    Handler {
        step: String,
        #[source]
        source: ScriptError,
    },
}

/// A play that stopped early, with the steps that completed before the failure.
#[derive(Debug, Error)]
#[error("play aborted after {} completed step(s): {error}", .report.steps().len())]
pub struct Aborted {
    pub report: Report,
    #[source]
    pub error: PlayError,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Aborted(#[from] Aborted),

    #[error("at least one test failed:\n{summary}")]
    TestsFailed { report: Report, summary: String },
}
