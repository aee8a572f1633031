//! Issuing one HTTP request and buffering its response.

mod client;
mod dial;

use bytes::Bytes;
use futures::future::BoxFuture;
use hyper::header::HeaderMap;
use hyper::{Method, StatusCode};
use url::Url;

use crate::error::TransportError;

pub use client::HttpClient;
pub use dial::{
    dial_fn, BoxedConnection, Connection, DialTransport, Dialer, FnDialer, TcpDialer, WithTimeout,
};
#[cfg(unix)]
pub use dial::UnixDialer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: Method,
    pub url: Url,
}

#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Sends a request and waits for the full response body.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a RequestRecord,
    ) -> BoxFuture<'a, Result<ResponseRecord, TransportError>>;
}
