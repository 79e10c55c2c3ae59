//! Scripted transport for unit and integration testing.
//!
//! Lets tests decide, per device address, what each endpoint answers, and
//! counts every call so that tests can assert that *no* request was made
//! (for example, after a disconnect or for a command sent to a device that is
//! not connected).  Addresses without a script behave as if nothing were
//! listening.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use buzzer_core::{CommandRequest, CommandResponse, SetNameRequest, SetNameResponse, StatusResponse};

use super::transport::{BuzzerTransport, TransportError};

/// What `GET /status` answers for a scripted address.
#[derive(Debug, Clone)]
pub enum StatusReply {
    /// HTTP 200 with this body.
    Body(StatusResponse),
    /// A non-success HTTP status.
    HttpError(u16),
    /// HTTP 200 with a body that is not JSON.
    Malformed,
    /// Connection refused.
    Unreachable,
    /// Nothing ever answers: the call waits for its full timeout, then
    /// fails as unreachable.
    Hang,
}

impl StatusReply {
    /// A healthy buzzer: `{status: "ok", device: name, mac}`.
    pub fn healthy(name: &str, mac: &str) -> Self {
        Self::Body(StatusResponse {
            status: Some("ok".to_string()),
            device: Some(name.to_string()),
            ip: None,
            mac: Some(mac.to_string()),
        })
    }

    /// A device answering with some other `status` value.
    pub fn unhealthy(status: &str) -> Self {
        Self::Body(StatusResponse {
            status: Some(status.to_string()),
            ..Default::default()
        })
    }
}

/// What `POST /message` or `POST /set-name` answers for a scripted address.
#[derive(Debug, Clone)]
pub enum AckReply {
    /// HTTP 200 with `{status: <value>}`.
    Status(String),
    HttpError(u16),
    Unreachable,
}

/// A mock implementation of [`BuzzerTransport`] driven by per-address scripts.
#[derive(Default)]
pub struct MockTransport {
    status_replies: Mutex<HashMap<IpAddr, StatusReply>>,
    command_replies: Mutex<HashMap<IpAddr, AckReply>>,
    set_name_replies: Mutex<HashMap<IpAddr, AckReply>>,
    status_calls: Mutex<HashMap<IpAddr, usize>>,
    command_calls: Mutex<HashMap<IpAddr, usize>>,
    set_name_calls: Mutex<HashMap<IpAddr, usize>>,
    sent_commands: Mutex<Vec<(IpAddr, CommandRequest)>>,
}

impl MockTransport {
    /// Creates a transport where every address is unreachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the `/status` reply of `ip`, replacing any previous script.
    pub fn set_status(&self, ip: IpAddr, reply: StatusReply) {
        self.status_replies
            .lock()
            .expect("lock poisoned")
            .insert(ip, reply);
    }

    /// Scripts the `/message` reply of `ip`.
    pub fn set_command_reply(&self, ip: IpAddr, reply: AckReply) {
        self.command_replies
            .lock()
            .expect("lock poisoned")
            .insert(ip, reply);
    }

    /// Scripts the `/set-name` reply of `ip`.
    pub fn set_name_reply(&self, ip: IpAddr, reply: AckReply) {
        self.set_name_replies
            .lock()
            .expect("lock poisoned")
            .insert(ip, reply);
    }

    /// Number of `/status` requests made to `ip` so far.
    pub fn status_calls(&self, ip: IpAddr) -> usize {
        count(&self.status_calls, ip)
    }

    /// Total `/status` requests across all addresses.
    pub fn total_status_calls(&self) -> usize {
        self.status_calls.lock().expect("lock poisoned").values().sum()
    }

    /// Number of `/message` requests made to `ip` so far.
    pub fn command_calls(&self, ip: IpAddr) -> usize {
        count(&self.command_calls, ip)
    }

    /// Number of `/set-name` requests made to `ip` so far.
    pub fn set_name_calls(&self, ip: IpAddr) -> usize {
        count(&self.set_name_calls, ip)
    }

    /// Every command body posted, in order.
    pub fn sent_commands(&self) -> Vec<(IpAddr, CommandRequest)> {
        self.sent_commands.lock().expect("lock poisoned").clone()
    }
}

fn count(calls: &Mutex<HashMap<IpAddr, usize>>, ip: IpAddr) -> usize {
    calls
        .lock()
        .expect("lock poisoned")
        .get(&ip)
        .copied()
        .unwrap_or(0)
}

fn record(calls: &Mutex<HashMap<IpAddr, usize>>, ip: IpAddr) {
    *calls.lock().expect("lock poisoned").entry(ip).or_insert(0) += 1;
}

fn ack_status(addr: SocketAddr, reply: Option<AckReply>) -> Result<Option<String>, TransportError> {
    match reply.unwrap_or(AckReply::Unreachable) {
        AckReply::Status(status) => Ok(Some(status)),
        AckReply::HttpError(status) => Err(TransportError::HttpStatus { addr, status }),
        AckReply::Unreachable => Err(TransportError::Unreachable { addr }),
    }
}

#[async_trait]
impl BuzzerTransport for MockTransport {
    async fn get_status(
        &self,
        addr: SocketAddr,
        timeout: Duration,
    ) -> Result<StatusResponse, TransportError> {
        let ip = addr.ip();
        record(&self.status_calls, ip);
        let reply = self
            .status_replies
            .lock()
            .expect("lock poisoned")
            .get(&ip)
            .cloned()
            .unwrap_or(StatusReply::Unreachable);

        match reply {
            StatusReply::Body(body) => Ok(body),
            StatusReply::HttpError(status) => Err(TransportError::HttpStatus { addr, status }),
            StatusReply::Malformed => match serde_json::from_str::<StatusResponse>("<html>") {
                Ok(body) => Ok(body),
                Err(source) => Err(TransportError::Decode { addr, source }),
            },
            StatusReply::Unreachable => Err(TransportError::Unreachable { addr }),
            StatusReply::Hang => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Unreachable { addr })
            }
        }
    }

    async fn post_command(
        &self,
        addr: SocketAddr,
        request: &CommandRequest,
    ) -> Result<CommandResponse, TransportError> {
        let ip = addr.ip();
        record(&self.command_calls, ip);
        self.sent_commands
            .lock()
            .expect("lock poisoned")
            .push((ip, request.clone()));
        let reply = self
            .command_replies
            .lock()
            .expect("lock poisoned")
            .get(&ip)
            .cloned();
        ack_status(addr, reply).map(|status| CommandResponse { status })
    }

    async fn post_set_name(
        &self,
        addr: SocketAddr,
        _request: &SetNameRequest,
    ) -> Result<SetNameResponse, TransportError> {
        let ip = addr.ip();
        record(&self.set_name_calls, ip);
        let reply = self
            .set_name_replies
            .lock()
            .expect("lock poisoned")
            .get(&ip)
            .cloned();
        ack_status(addr, reply).map(|status| SetNameResponse { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(ip: &str) -> SocketAddr {
        SocketAddr::new(ip.parse().unwrap(), 80)
    }

    #[tokio::test]
    async fn test_unscripted_address_is_unreachable() {
        // Arrange
        let transport = MockTransport::new();

        // Act
        let result = transport
            .get_status(addr("10.0.0.9"), Duration::from_secs(2))
            .await;

        // Assert
        assert!(matches!(result, Err(TransportError::Unreachable { .. })));
        assert_eq!(transport.status_calls(addr("10.0.0.9").ip()), 1);
    }

    #[tokio::test]
    async fn test_scripted_status_reply_is_returned() {
        let transport = MockTransport::new();
        let target = addr("10.0.0.7");
        transport.set_status(target.ip(), StatusReply::healthy("QuizBuzzer1", "AA:11:BB:22:CC:33"));

        let reply = transport
            .get_status(target, Duration::from_secs(2))
            .await
            .unwrap();

        assert!(reply.is_ok());
        assert_eq!(reply.device.as_deref(), Some("QuizBuzzer1"));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_a_decode_error() {
        let transport = MockTransport::new();
        let target = addr("10.0.0.7");
        transport.set_status(target.ip(), StatusReply::Malformed);

        let result = transport.get_status(target, Duration::from_secs(2)).await;

        assert!(matches!(result, Err(TransportError::Decode { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_address_fails_only_after_the_timeout() {
        // Arrange
        let transport = MockTransport::new();
        let target = addr("10.0.0.8");
        transport.set_status(target.ip(), StatusReply::Hang);
        let started = tokio::time::Instant::now();

        // Act
        let result = transport.get_status(target, Duration::from_secs(2)).await;

        // Assert
        assert!(matches!(result, Err(TransportError::Unreachable { .. })));
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(transport.status_calls(target.ip()), 1);
    }

    #[tokio::test]
    async fn test_commands_are_counted_and_recorded() {
        // Arrange
        let transport = MockTransport::new();
        let target = addr("10.0.0.7");
        transport.set_command_reply(target.ip(), AckReply::Status("received".to_string()));

        // Act
        let reply = transport
            .post_command(target, &CommandRequest::command("DebutQuiz"))
            .await
            .unwrap();

        // Assert
        assert!(reply.is_received());
        assert_eq!(transport.command_calls(target.ip()), 1);
        assert_eq!(transport.sent_commands()[0].1.action, "DebutQuiz");
    }
}
