//! HTTP adapter for a colony registry gateway.
//!
//! One short-lived HTTP/1.1 connection per request, driven by hyper the
//! same way the health probes are. Call timeouts are the caller's concern.

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::source::{ColonyHandle, ColonyId, ColonySource};

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColonyResponse {
    domain_count: u64,
    task_count: u64,
}

/// Colony source backed by a registry gateway at `host:port`.
#[derive(Debug, Clone)]
pub struct HttpColonySource {
    address: String,
}

impl HttpColonySource {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// GET `path` and decode the JSON body. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SourceResult<Option<T>> {
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|e| SourceError::Unavailable(format!("connect {}: {e}", self.address)))?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| SourceError::Unavailable(format!("handshake {}: {e}", self.address)))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "registry connection closed with error");
            }
        });

        let req = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::HOST, &self.address)
            .header(header::USER_AGENT, "colony-inspector/0.1")
            .header(header::ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| SourceError::Protocol(format!("build request {path}: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| SourceError::Unavailable(format!("GET {path}: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%path, "registry returned 404");
            return Ok(None);
        }
        if status.is_server_error() {
            return Err(SourceError::Unavailable(format!("GET {path} returned {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Protocol(format!("GET {path} returned {status}")));
        }

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| SourceError::Unavailable(format!("read body {path}: {e}")))?
            .to_bytes();

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| SourceError::Protocol(format!("decode {path}: {e}")))
    }

    async fn get_count(&self, path: &str) -> SourceResult<u64> {
        self.get_json::<CountResponse>(path)
            .await?
            .map(|r| r.count)
            .ok_or_else(|| SourceError::Protocol(format!("{path} not served by registry")))
    }
}

#[async_trait]
impl ColonySource for HttpColonySource {
    async fn colony_count(&self) -> SourceResult<u64> {
        self.get_count("/colonies/count").await
    }

    async fn skill_count(&self) -> SourceResult<u64> {
        self.get_count("/skills/count").await
    }

    async fn colony(&self, id: ColonyId) -> SourceResult<Box<dyn ColonyHandle>> {
        let path = format!("/colonies/{id}");
        match self.get_json::<ColonyResponse>(&path).await? {
            Some(r) => Ok(Box::new(HttpColony {
                id,
                domain_count: r.domain_count,
                task_count: r.task_count,
            })),
            None => Err(SourceError::NotFound(id)),
        }
    }
}

/// Counters fetched in a single gateway round trip.
struct HttpColony {
    id: ColonyId,
    domain_count: u64,
    task_count: u64,
}

#[async_trait]
impl ColonyHandle for HttpColony {
    fn id(&self) -> ColonyId {
        self.id
    }

    async fn domain_count(&self) -> SourceResult<u64> {
        Ok(self.domain_count)
    }

    async fn task_count(&self) -> SourceResult<u64> {
        Ok(self.task_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_port_is_unavailable() {
        let source = HttpColonySource::new("127.0.0.1:1");
        let err = source.colony_count().await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)), "got {err:?}");
    }

    #[test]
    fn colony_response_uses_camel_case() {
        let r: ColonyResponse =
            serde_json::from_str(r#"{"domainCount": 2, "taskCount": 10}"#).unwrap();
        assert_eq!(r.domain_count, 2);
        assert_eq!(r.task_count, 10);
    }
}
