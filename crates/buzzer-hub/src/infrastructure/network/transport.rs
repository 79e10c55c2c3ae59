//! Transport seam between the hub and the buzzers' HTTP control endpoints.
//!
//! Discovery and sessions never build URLs or parse bodies themselves: they
//! call a [`BuzzerTransport`] and get back either a typed reply or a
//! [`TransportError`].  Production code uses [`HttpTransport`]; tests inject
//! [`super::mock::MockTransport`] or a `mockall` mock so they can count calls
//! and script failures without a network.
//!
//! # What counts as a failure (for beginners)
//!
//! From the hub's point of view three different things can go wrong on a
//! single request, and the transport reports each one distinctly:
//!
//! 1. Nothing answered: connection refused, DNS failure, or the timeout
//!    elapsed ([`TransportError::Request`] / [`TransportError::Unreachable`]).
//! 2. Something answered, but with a non-2xx HTTP status
//!    ([`TransportError::HttpStatus`]).
//! 3. A 2xx answer arrived but its body was not the JSON we expect
//!    ([`TransportError::Decode`]).
//!
//! A well-formed body whose `status` field is not the expected acknowledgement
//! is *not* a transport error; the caller decides what it means.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use buzzer_core::protocol::messages::{MESSAGE_PATH, SET_NAME_PATH, STATUS_PATH};
use buzzer_core::{CommandRequest, CommandResponse, SetNameRequest, SetNameResponse, StatusResponse};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::trace;

/// Timeout for command and session requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for a single request to a buzzer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    /// The request never got an HTTP answer (refused, timed out, reset...).
    #[error("request to {addr} failed: {source}")]
    Request {
        addr: SocketAddr,
        #[source]
        source: reqwest::Error,
    },
    /// The device answered with a non-success HTTP status.
    #[error("{addr} answered HTTP {status}")]
    HttpStatus { addr: SocketAddr, status: u16 },
    /// The body was not the expected JSON document.
    #[error("malformed reply from {addr}: {source}")]
    Decode {
        addr: SocketAddr,
        #[source]
        source: serde_json::Error,
    },
    /// Nothing is listening at the address.
    #[error("{addr} is unreachable")]
    Unreachable { addr: SocketAddr },
}

/// One method per buzzer control endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BuzzerTransport: Send + Sync {
    /// `GET /status` with an explicit per-request timeout.
    async fn get_status(
        &self,
        addr: SocketAddr,
        timeout: Duration,
    ) -> Result<StatusResponse, TransportError>;

    /// `POST /message`.
    async fn post_command(
        &self,
        addr: SocketAddr,
        request: &CommandRequest,
    ) -> Result<CommandResponse, TransportError>;

    /// `POST /set-name`.
    async fn post_set_name(
        &self,
        addr: SocketAddr,
        request: &SetNameRequest,
    ) -> Result<SetNameResponse, TransportError>;
}

// ── HTTP implementation ───────────────────────────────────────────────────────

/// [`BuzzerTransport`] over plain HTTP with JSON bodies.
///
/// A single `reqwest::Client` is shared by every request so that discovery's
/// 254 parallel probes reuse one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose POST requests time out after `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the HTTP client cannot be
    /// initialised.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self { client })
    }

    async fn read_json<T: DeserializeOwned>(
        addr: SocketAddr,
        request: reqwest::RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|source| TransportError::Request { addr, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                addr,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Request { addr, source })?;
        trace!("{addr} replied {body}");
        serde_json::from_str(&body).map_err(|source| TransportError::Decode { addr, source })
    }
}

/// Builds the URL of `path` on the device at `addr`.
pub fn endpoint_url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

#[async_trait]
impl BuzzerTransport for HttpTransport {
    async fn get_status(
        &self,
        addr: SocketAddr,
        timeout: Duration,
    ) -> Result<StatusResponse, TransportError> {
        let request = self
            .client
            .get(endpoint_url(addr, STATUS_PATH))
            .timeout(timeout);
        Self::read_json(addr, request).await
    }

    async fn post_command(
        &self,
        addr: SocketAddr,
        request: &CommandRequest,
    ) -> Result<CommandResponse, TransportError> {
        let request = self.client.post(endpoint_url(addr, MESSAGE_PATH)).json(request);
        Self::read_json(addr, request).await
    }

    async fn post_set_name(
        &self,
        addr: SocketAddr,
        request: &SetNameRequest,
    ) -> Result<SetNameResponse, TransportError> {
        let request = self.client.post(endpoint_url(addr, SET_NAME_PATH)).json(request);
        Self::read_json(addr, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one HTTP response on an ephemeral local port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        addr
    }

    #[test]
    fn test_endpoint_url_includes_port_and_path() {
        let addr: SocketAddr = "10.0.0.7:80".parse().unwrap();
        assert_eq!(endpoint_url(addr, STATUS_PATH), "http://10.0.0.7:80/status");
    }

    #[tokio::test]
    async fn test_get_status_decodes_ok_reply() {
        // Arrange
        let addr = serve_once(
            "200 OK",
            r#"{"status":"ok","device":"QuizBuzzer1","ip":"127.0.0.1","mac":"AA:11:BB:22:CC:33"}"#,
        )
        .await;
        let transport = HttpTransport::new(DEFAULT_REQUEST_TIMEOUT).unwrap();

        // Act
        let reply = transport
            .get_status(addr, Duration::from_secs(2))
            .await
            .expect("status must decode");

        // Assert
        assert!(reply.is_ok());
        assert_eq!(reply.device.as_deref(), Some("QuizBuzzer1"));
    }

    #[tokio::test]
    async fn test_get_status_reports_http_error_status() {
        let addr = serve_once("500 Internal Server Error", "{}").await;
        let transport = HttpTransport::new(DEFAULT_REQUEST_TIMEOUT).unwrap();

        let result = transport.get_status(addr, Duration::from_secs(2)).await;

        assert!(matches!(
            result,
            Err(TransportError::HttpStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_status_reports_malformed_body() {
        let addr = serve_once("200 OK", "not json").await;
        let transport = HttpTransport::new(DEFAULT_REQUEST_TIMEOUT).unwrap();

        let result = transport.get_status(addr, Duration::from_secs(2)).await;

        assert!(matches!(result, Err(TransportError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_post_command_decodes_received_reply() {
        let addr = serve_once("200 OK", r#"{"status":"received"}"#).await;
        let transport = HttpTransport::new(DEFAULT_REQUEST_TIMEOUT).unwrap();

        let reply = transport
            .post_command(addr, &CommandRequest::command("DebutQuiz"))
            .await
            .expect("command must decode");

        assert!(reply.is_received());
    }

    #[tokio::test]
    async fn test_get_status_fails_when_nothing_listens() {
        // Arrange: grab a free port, then close it so the connect is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let transport = HttpTransport::new(DEFAULT_REQUEST_TIMEOUT).unwrap();

        // Act
        let result = transport.get_status(addr, Duration::from_secs(2)).await;

        // Assert
        assert!(matches!(result, Err(TransportError::Request { .. })));
    }
}
