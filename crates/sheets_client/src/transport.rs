//! Resilient transport: retry, backoff and credential refresh around a
//! single HTTP exchange.
//!
//! Per call, the transport walks a small state machine:
//!
//! | State             | On                          | Next                         |
//! |-------------------|-----------------------------|------------------------------|
//! | `Attempting(i)`   | 401, refresh configured     | `RefreshedOnce(i)` (no delay)|
//! | `Attempting(i)`   | 403                         | `Forbidden`                  |
//! | `Attempting(i)`   | 429 / 5xx, `i < attempts`   | sleep, `Attempting(i + 1)`   |
//! | `Attempting(i)`   | 429 / 5xx, `i == attempts`  | `Exhausted`                  |
//! | `Attempting(i)`   | anything else               | `Done`                       |
//! | `RefreshedOnce(i)`| 401                         | `Done` (no second refresh)   |
//! | `RefreshedOnce(i)`| other                       | as `Attempting(i)`           |
//!
//! `Forbidden`, `Exhausted` and `Done` all hand the last response back to
//! the caller. Total sends are at most `backoff_attempts + 1`, plus one for
//! the refresh branch.

use std::time::Duration;

use rand::Rng;

use crate::error::ClientError;

pub const USER_AGENT: &str = concat!("sheetx/", env!("CARGO_PKG_VERSION"));

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Request {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: reqwest::Method::GET,
            url: url.into(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn with_bearer(&self, token: &str) -> Self {
        let mut request = self.clone();
        request
            .headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case("authorization"));
        request
            .headers
            .push(("Authorization".to_string(), format!("Bearer {}", token)));
        request
    }
}

/// Whether a 403 should end the whole job or only the current resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenVerdict {
    ContinueJob,
    AbortJob,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub body: String,
    /// Set only for 403 responses, after the forbidden policy has run.
    pub forbidden: Option<ForbiddenVerdict>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            reason,
            body: body.into(),
            forbidden: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One HTTP exchange. The transport owns retry; implementors must not.
pub trait HttpSend: Send {
    fn send(&self, request: &Request) -> Result<Response, ClientError>;
}

/// Production sender over a blocking reqwest client.
pub struct ReqwestSend {
    http: reqwest::blocking::Client,
}

impl ReqwestSend {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self { http })
    }
}

impl HttpSend for ReqwestSend {
    fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let resp = builder
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let status = resp.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        let body = resp.text().map_err(|e| ClientError::Body(e.to_string()))?;

        Ok(Response {
            status: status.as_u16(),
            reason,
            body,
            forbidden: None,
        })
    }
}

// ── Retry configuration ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt for 429 / 5xx / network failures.
    pub backoff_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random jitter, in percent of the current delay.
    pub jitter_percent: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_attempts: 9,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter_percent: 20,
        }
    }
}

/// `min(base * 2^attempt + jitter, max)`
pub fn backoff_delay(config: &RetryConfig, attempt: u32, jitter: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    let exponential = config.base_delay.saturating_mul(factor);
    exponential.saturating_add(jitter).min(config.max_delay)
}

fn random_jitter(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    let exponential = config.base_delay.saturating_mul(factor).min(config.max_delay);
    let max_jitter_ms = exponential.as_millis() as u64 * config.jitter_percent as u64 / 100;
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter_ms))
}

// ── Transport ───────────────────────────────────────────────────────

type ForbiddenPolicy = Box<dyn Fn(&Response) -> bool + Send>;
type RefreshCallback = Box<dyn FnMut() -> Result<String, ClientError> + Send>;
type Sleeper = Box<dyn Fn(Duration) + Send>;

enum State {
    Attempting(u32),
    RefreshedOnce(u32),
    Forbidden(Response),
    Exhausted(Response),
    Done(Response),
}

/// HTTP caller with retry, backoff, one-shot token refresh and a
/// pluggable 403 policy.
///
/// The bearer token is owned here. A successful refresh replaces it for
/// every later call on this instance.
pub struct Transport {
    http: Box<dyn HttpSend>,
    config: RetryConfig,
    bearer: Option<String>,
    on_forbidden: ForbiddenPolicy,
    refresh: Option<RefreshCallback>,
    sleep: Sleeper,
}

impl Transport {
    pub fn new(http: Box<dyn HttpSend>, bearer: Option<String>) -> Self {
        Self {
            http,
            config: RetryConfig::default(),
            bearer: bearer.filter(|t| !t.is_empty()),
            on_forbidden: Box::new(|_| false),
            refresh: None,
            sleep: Box::new(std::thread::sleep),
        }
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_backoff_attempts(mut self, attempts: u32) -> Self {
        self.config.backoff_attempts = attempts;
        self
    }

    /// `policy` returns whether the job may continue past the forbidden
    /// resource. The call itself always ends on a 403.
    pub fn on_forbidden(mut self, policy: impl Fn(&Response) -> bool + Send + 'static) -> Self {
        self.on_forbidden = Box::new(policy);
        self
    }

    /// `refresh` returns a fresh access token. An empty token leaves the
    /// 401 as the final response.
    pub fn on_unauthorized_refresh(
        mut self,
        refresh: impl FnMut() -> Result<String, ClientError> + Send + 'static,
    ) -> Self {
        self.refresh = Some(Box::new(refresh));
        self
    }

    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + Send + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    /// Run one logical call to completion and return the final response,
    /// whatever its status. Only network failures after retries, body read
    /// failures and refresh failures are errors.
    pub fn call(&mut self, request: &Request) -> Result<Response, ClientError> {
        let mut refreshed = false;
        let mut state = State::Attempting(0);

        loop {
            state = match state {
                State::Attempting(attempt) | State::RefreshedOnce(attempt) => {
                    match self.send_once(request) {
                        Ok(response) => self.advance(attempt, response, &mut refreshed)?,
                        Err(ClientError::Network(msg)) if attempt < self.config.backoff_attempts => {
                            let delay = self.pause(attempt, &msg);
                            log::debug!("slept {}ms after network error", delay.as_millis());
                            State::Attempting(attempt + 1)
                        }
                        Err(e) => return Err(e),
                    }
                }
                State::Forbidden(mut response) => {
                    let verdict = if (self.on_forbidden)(&response) {
                        ForbiddenVerdict::ContinueJob
                    } else {
                        ForbiddenVerdict::AbortJob
                    };
                    response.forbidden = Some(verdict);
                    return Ok(response);
                }
                State::Exhausted(response) => {
                    log::warn!(
                        "giving up on {} after {} attempts (HTTP {})",
                        request.url,
                        self.config.backoff_attempts + 1,
                        response.status,
                    );
                    return Ok(response);
                }
                State::Done(response) => return Ok(response),
            };
        }
    }

    fn send_once(&self, request: &Request) -> Result<Response, ClientError> {
        match &self.bearer {
            Some(token) => self.http.send(&request.with_bearer(token)),
            None => self.http.send(request),
        }
    }

    fn advance(
        &mut self,
        attempt: u32,
        response: Response,
        refreshed: &mut bool,
    ) -> Result<State, ClientError> {
        let next = match response.status {
            401 if !*refreshed => match self.refresh.as_mut() {
                Some(refresh) => {
                    *refreshed = true;
                    log::info!("access token rejected, refreshing");
                    let token = refresh()?;
                    if token.is_empty() {
                        State::Done(response)
                    } else {
                        self.bearer = Some(token);
                        State::RefreshedOnce(attempt)
                    }
                }
                None => State::Done(response),
            },
            403 => State::Forbidden(response),
            429 | 500..=599 => {
                if attempt < self.config.backoff_attempts {
                    self.pause(attempt, &format!("HTTP {}", response.status));
                    State::Attempting(attempt + 1)
                } else {
                    State::Exhausted(response)
                }
            }
            _ => State::Done(response),
        };
        Ok(next)
    }

    fn pause(&self, attempt: u32, cause: &str) -> Duration {
        let jitter = random_jitter(&self.config, attempt);
        let delay = backoff_delay(&self.config, attempt, jitter);
        log::warn!(
            "retry {}/{} in {}ms ({})",
            attempt + 1,
            self.config.backoff_attempts,
            delay.as_millis(),
            cause,
        );
        (self.sleep)(delay);
        delay
    }
}
