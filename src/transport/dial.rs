//! Plain HTTP/1.1 over connections opened by a pluggable [`Dialer`].

use std::io;
#[cfg(unix)]
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use http_body_util::{BodyExt, Empty};
use hyper::header::HOST;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use url::Position;

use super::{RequestRecord, ResponseRecord, Transport};
use crate::error::TransportError;

pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

pub type BoxedConnection = Box<dyn Connection>;

/// Opens a byte stream to `address` on `network` ("tcp" for http URLs).
pub trait Dialer: Send + Sync {
    fn dial<'a>(
        &'a self,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, io::Result<BoxedConnection>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    fn dial<'a>(
        &'a self,
        _network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, io::Result<BoxedConnection>> {
        async move {
            let stream = tokio::net::TcpStream::connect(address).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream) as BoxedConnection)
        }
        .boxed()
    }
}

/// Ignores the requested address and connects to a Unix socket.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct UnixDialer {
    path: PathBuf,
}

#[cfg(unix)]
impl UnixDialer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(unix)]
impl Dialer for UnixDialer {
    fn dial<'a>(
        &'a self,
        _network: &'a str,
        _address: &'a str,
    ) -> BoxFuture<'a, io::Result<BoxedConnection>> {
        async move {
            let stream = tokio::net::UnixStream::connect(&self.path).await?;
            Ok(Box::new(stream) as BoxedConnection)
        }
        .boxed()
    }
}

/// Bounds the time spent opening a connection.
#[derive(Debug, Clone)]
pub struct WithTimeout<D> {
    inner: D,
    timeout: Duration,
}

impl<D: Dialer> WithTimeout<D> {
    pub fn new(inner: D, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl<D: Dialer> Dialer for WithTimeout<D> {
    fn dial<'a>(
        &'a self,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, io::Result<BoxedConnection>> {
        async move {
            match tokio::time::timeout(self.timeout, self.inner.dial(network, address)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {}ms", self.timeout.as_millis()),
                )),
            }
        }
        .boxed()
    }
}

/// Dialer backed by a closure.
pub struct FnDialer<F>(F);

pub fn dial_fn<F>(f: F) -> FnDialer<F>
where
    F: Fn(&str, &str) -> BoxFuture<'static, io::Result<BoxedConnection>> + Send + Sync,
{
    FnDialer(f)
}

impl<F> Dialer for FnDialer<F>
where
    F: Fn(&str, &str) -> BoxFuture<'static, io::Result<BoxedConnection>> + Send + Sync,
{
    fn dial<'a>(
        &'a self,
        network: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, io::Result<BoxedConnection>> {
        (self.0)(network, address)
    }
}

/// Sends each request on a fresh connection from the dialer.
///
/// Only `http` URLs are supported; TLS is left to [`super::HttpClient`].
pub struct DialTransport<D> {
    dialer: D,
}

impl<D: Dialer> DialTransport<D> {
    pub fn new(dialer: D) -> Self {
        Self { dialer }
    }
}

impl<D: Dialer> Transport for DialTransport<D> {
    fn send<'a>(
        &'a self,
        request: &'a RequestRecord,
    ) -> BoxFuture<'a, Result<ResponseRecord, TransportError>> {
        async move {
            let url = &request.url;
            if url.scheme() != "http" {
                return Err(TransportError::UnsupportedScheme(url.scheme().to_string()));
            }
            let host = url
                .host_str()
                .ok_or_else(|| TransportError::MissingHost(url.to_string()))?;
            let port = url.port_or_known_default().unwrap_or(80);
            let address = format!("{host}:{port}");

            let stream = self
                .dialer
                .dial("tcp", &address)
                .await
                .map_err(|source| TransportError::Connect {
                    address: address.clone(),
                    source,
                })?;
            let (mut sender, connection) =
                hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

            let authority = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let outgoing = hyper::Request::builder()
                .method(request.method.clone())
                .uri(&url[Position::BeforePath..Position::AfterQuery])
                .header(HOST, authority)
                .body(Empty::<Bytes>::new())?;
            let exchange = async {
                let response = sender.send_request(outgoing).await?;
                let (parts, body) = response.into_parts();
                let body = body.collect().await?.to_bytes();
                Ok::<_, TransportError>(ResponseRecord {
                    status: parts.status,
                    headers: parts.headers,
                    body,
                })
            };
            tokio::pin!(exchange);
            tokio::pin!(connection);

            // the connection is driven here and dropped with the step
            tokio::select! {
                response = &mut exchange => response,
                closed = &mut connection => {
                    if let Err(err) = closed {
                        tracing::debug!(error = %err, "connection closed with error");
                        return Err(err.into());
                    }
                    exchange.await
                }
            }
        }
        .boxed()
    }
}
