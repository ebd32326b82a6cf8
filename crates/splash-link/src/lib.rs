pub mod doctor;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    IdentifyRocket,
    RocketState,
    UploadFlightData,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::IdentifyRocket => "/api/identify-rocket",
            Endpoint::RocketState => "/api/rocket-state",
            Endpoint::UploadFlightData => "/api/upload-flight-data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("payload encoding: {0}")]
    Encoding(String),
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Blocking request/response channel to the pad. Implementations may fail
/// transiently; callers decide how often to retry.
pub trait Transport {
    fn send_command(&mut self, endpoint: Endpoint, payload: &[u8]) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_command(&mut self, endpoint: Endpoint, payload: &[u8]) -> Result<Response, TransportError> {
        (**self).send_command(endpoint, payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 5, delay_ms: 1000 }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone)]
pub struct LinkHealth {
    pub rtt_ms: Option<u32>,
    pub quality: u8, // 0-100
    pub consecutive_failures: u32,
    pub total_failures: u64,
}

impl Default for LinkHealth {
    fn default() -> Self {
        Self {
            rtt_ms: None,
            quality: 100,
            consecutive_failures: 0,
            total_failures: 0,
        }
    }
}

impl LinkHealth {
    fn on_success(&mut self, rtt: Duration) {
        self.rtt_ms = Some(rtt.as_millis() as u32);
        self.consecutive_failures = 0;
        self.quality = (self.quality + 10).min(100);
    }

    fn on_failure(&mut self) {
        self.consecutive_failures += 1;
        self.total_failures += 1;
        self.quality = self.quality.saturating_sub(20);
    }
}

/// A transport wrapped in an explicit retry policy.
pub struct Link<T> {
    transport: T,
    policy: RetryPolicy,
    health: LinkHealth,
    sleep: fn(Duration),
}

impl<T: Transport> Link<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            health: LinkHealth::default(),
            sleep: std::thread::sleep,
        }
    }

    /// Replace the inter-attempt sleep (tests and simulations pass a no-op).
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn health(&self) -> &LinkHealth {
        &self.health
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Single attempt, no retry. Used for best-effort pushes.
    pub fn send_once(&mut self, endpoint: Endpoint, payload: &[u8]) -> Result<Response, TransportError> {
        let start = Instant::now();
        let res = self
            .transport
            .send_command(endpoint, payload)
            .and_then(|resp| {
                if resp.is_success() {
                    Ok(resp)
                } else {
                    Err(TransportError::Rejected { status: resp.status, body: resp.body_text() })
                }
            });
        match &res {
            Ok(_) => self.health.on_success(start.elapsed()),
            Err(_) => self.health.on_failure(),
        }
        res
    }

    /// Up to `policy.attempts` tries with `policy.delay_ms` between them.
    pub fn send_with_retry(&mut self, endpoint: Endpoint, payload: &[u8]) -> Result<Response, TransportError> {
        let attempts = self.policy.attempts.max(1);
        let mut last = String::new();
        for attempt in 1..=attempts {
            match self.send_once(endpoint, payload) {
                Ok(resp) => {
                    if attempt > 1 {
                        info!("link: {} succeeded on attempt {}", endpoint.path(), attempt);
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    warn!(
                        "link: {} attempt {}/{} failed (quality: {}%): {}",
                        endpoint.path(),
                        attempt,
                        attempts,
                        self.health.quality,
                        e
                    );
                    last = e.to_string();
                    if attempt < attempts {
                        (self.sleep)(self.policy.delay());
                    }
                }
            }
        }
        Err(TransportError::Exhausted { attempts, last })
    }

    /// JSON request with retry, JSON response.
    pub fn request<Req, Resp>(&mut self, endpoint: Endpoint, req: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = encode(req)?;
        let resp = self.send_with_retry(endpoint, &payload)?;
        serde_json::from_slice(&resp.body).map_err(|e| TransportError::Encoding(e.to_string()))
    }

    /// JSON push, single attempt, response body ignored.
    pub fn push<Req: Serialize>(&mut self, endpoint: Endpoint, req: &Req) -> Result<(), TransportError> {
        let payload = encode(req)?;
        self.send_once(endpoint, &payload).map(|_| ())
    }
}

pub fn encode<Req: Serialize>(req: &Req) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(req).map_err(|e| TransportError::Encoding(e.to_string()))
}
