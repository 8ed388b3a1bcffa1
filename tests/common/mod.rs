#![allow(dead_code)]

use page_miner::{HttpError, HttpSend, RawResponse, RequestSpec};
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub enum Reply {
    Status(RawResponse),
    TransportError,
}

pub struct Step {
    pub reply: Reply,
    pub delay: Duration,
}

pub fn ok(body: Value) -> Step {
    Step {
        reply: Reply::Status(RawResponse::json(StatusCode::OK, &body)),
        delay: Duration::ZERO,
    }
}

pub fn status(code: u16) -> Step {
    let status = StatusCode::from_u16(code).unwrap();
    Step {
        reply: Reply::Status(RawResponse::new(status, "")),
        delay: Duration::ZERO,
    }
}

pub fn too_many(retry_after: &str) -> Step {
    let mut resp = RawResponse::new(StatusCode::TOO_MANY_REQUESTS, "");
    resp.headers
        .insert(RETRY_AFTER, HeaderValue::from_str(retry_after).unwrap());
    Step {
        reply: Reply::Status(resp),
        delay: Duration::ZERO,
    }
}

pub fn transport_error() -> Step {
    Step {
        reply: Reply::TransportError,
        delay: Duration::ZERO,
    }
}

impl Step {
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// In-process transport that replays scripted replies per (url, page) and
/// records what it saw.
#[derive(Default)]
pub struct ScriptedSender {
    page_param: String,
    script: Mutex<HashMap<(String, String), VecDeque<Step>>>,
    calls: Mutex<Vec<(RequestSpec, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    default_delay: Duration,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self {
            page_param: "pagina".into(),
            ..Default::default()
        }
    }

    pub fn with_page_param(mut self, name: &str) -> Self {
        self.page_param = name.into();
        self
    }

    /// Every reply without its own delay takes this long.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn on(self, url: &str, page: u32, steps: Vec<Step>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry((url.to_string(), page.to_string()))
            .or_default()
            .extend(steps);
        self
    }

    pub fn calls(&self) -> Vec<RequestSpec> {
        self.calls.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn pages_requested(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|r| r.params.get(&self.page_param).cloned().unwrap_or_else(|| "1".into()))
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl HttpSend for ScriptedSender {
    async fn send(&self, req: &RequestSpec) -> Result<RawResponse, HttpError> {
        let page = req
            .params
            .get(&self.page_param)
            .cloned()
            .unwrap_or_else(|| "1".into());
        self.calls.lock().unwrap().push((req.clone(), Instant::now()));
        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(&(req.url.clone(), page))
            .and_then(|q| q.pop_front());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (reply, delay) = match step {
            Some(s) => (s.reply, s.delay),
            None => (
                Reply::Status(RawResponse::new(StatusCode::NOT_FOUND, "")),
                Duration::ZERO,
            ),
        };
        let delay = if delay.is_zero() { self.default_delay } else { delay };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Status(r) => Ok(r),
            Reply::TransportError => Err(HttpError::InvalidHeader {
                name: "connection".into(),
                reason: "reset by peer".into(),
            }),
        }
    }
}
