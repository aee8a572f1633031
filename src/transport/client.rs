use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use super::{RequestRecord, ResponseRecord, Transport};
use crate::error::TransportError;

/// Default transport: reqwest with the system resolver and TCP dialer.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpClient {
    fn send<'a>(
        &'a self,
        request: &'a RequestRecord,
    ) -> BoxFuture<'a, Result<ResponseRecord, TransportError>> {
        async move {
            let response = self
                .client
                .request(request.method.clone(), request.url.clone())
                .send()
                .await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok(ResponseRecord {
                status,
                headers,
                body,
            })
        }
        .boxed()
    }
}
