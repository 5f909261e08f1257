//! Streaming HTTP download primitive.
//!
//! The pipeline only needs "GET this endpoint and hand me the status, the
//! declared content type and a byte stream"; [`HttpTransport`] provides that
//! over reqwest.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::error::FetchError;

pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// An in-flight response whose body has not been read yet.
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into memory.
    pub async fn into_bytes(mut self) -> Result<Vec<u8>, FetchError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET and return as soon as the response headers are in.
    async fn get(&self, endpoint: &str) -> Result<TransportResponse, FetchError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent.to_string());
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: &str) -> Result<TransportResponse, FetchError> {
        let resp = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| FetchError::transport(endpoint, e))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let owned = endpoint.to_string();
        let body = resp
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| FetchError::transport(&owned, e)))
            .boxed();
        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    use futures_util::stream;

    use super::*;

    #[derive(Clone)]
    pub(crate) enum FakeReply {
        Body {
            content_type: Option<String>,
            chunks: Vec<Vec<u8>>,
        },
        Status(u16),
        Refused,
        /// Sends one chunk, then fails mid-stream.
        Broken { first_chunk: Vec<u8> },
    }

    impl FakeReply {
        pub(crate) fn body(content_type: &str, bytes: &[u8]) -> Self {
            Self::Body {
                content_type: Some(content_type.to_string()),
                chunks: bytes.chunks(7).map(<[u8]>::to_vec).collect(),
            }
        }
    }

    /// Serves canned replies keyed by endpoint and records every request.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        replies: HashMap<String, FakeReply>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub(crate) fn with(mut self, endpoint: &str, reply: FakeReply) -> Self {
            self.replies.insert(endpoint.to_string(), reply);
            self
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, endpoint: &str) -> Result<TransportResponse, FetchError> {
            self.requests.lock().unwrap().push(endpoint.to_string());
            let reply = self
                .replies
                .get(endpoint)
                .cloned()
                .unwrap_or(FakeReply::Status(404));
            tokio::task::yield_now().await;
            match reply {
                FakeReply::Body {
                    content_type,
                    chunks,
                } => Ok(TransportResponse {
                    status: 200,
                    content_type,
                    body: stream::iter(chunks.into_iter().map(|c| Ok::<_, FetchError>(Bytes::from(c))))
                        .boxed(),
                }),
                FakeReply::Status(status) => Ok(TransportResponse {
                    status,
                    content_type: None,
                    body: stream::empty::<Result<Bytes, FetchError>>().boxed(),
                }),
                FakeReply::Refused => Err(FetchError::transport(
                    endpoint,
                    io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
                )),
                FakeReply::Broken { first_chunk } => {
                    let owned = endpoint.to_string();
                    let items = vec![
                        Ok(Bytes::from(first_chunk)),
                        Err(FetchError::transport(
                            &owned,
                            io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"),
                        )),
                    ];
                    Ok(TransportResponse {
                        status: 200,
                        content_type: Some("audio/mpeg".to_string()),
                        body: stream::iter(items).boxed(),
                    })
                }
            }
        }
    }
}
