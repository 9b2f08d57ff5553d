//! Scripted doubles for every capability, for deterministic tests without
//! a simulator or network access.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use waypoint_core::{
    Address, CompletionProvider, Geocoder, ImageSearch, Position, ServiceError, TelemetryError,
    TelemetryFactory, TelemetrySource, LATITUDE_FIELD, LONGITUDE_FIELD,
};

/// Telemetry that reports a fixed position (in radians), optionally failing
/// the first N connects or reads.
pub struct MockTelemetry {
    position: Mutex<(f64, f64)>,
    failing_connects: AtomicUsize,
    failing_reads: AtomicUsize,
    connect_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl MockTelemetry {
    pub fn new(latitude_rad: f64, longitude_rad: f64) -> Self {
        Self {
            position: Mutex::new((latitude_rad, longitude_rad)),
            failing_connects: AtomicUsize::new(0),
            failing_reads: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_connects(self, n: usize) -> Self {
        self.failing_connects.store(n, Ordering::Relaxed);
        self
    }

    pub fn failing_reads(self, n: usize) -> Self {
        self.failing_reads.store(n, Ordering::Relaxed);
        self
    }

    pub fn set_position(&self, latitude_rad: f64, longitude_rad: f64) {
        *self.position.lock() = (latitude_rad, longitude_rad);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::Relaxed)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Relaxed)
    }
}

/// Decrement `counter` if positive; true when a failure should be injected.
fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl TelemetrySource for MockTelemetry {
    async fn connect(&self) -> Result<(), TelemetryError> {
        self.connect_calls.fetch_add(1, Ordering::Relaxed);
        if take_failure(&self.failing_connects) {
            return Err(TelemetryError::Unreachable("mock bridge offline".into()));
        }
        Ok(())
    }

    async fn get(&self, fields: &[&str]) -> Result<HashMap<String, f64>, TelemetryError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        if take_failure(&self.failing_reads) {
            return Err(TelemetryError::Unreachable("mock bridge offline".into()));
        }
        let (lat, lon) = *self.position.lock();
        fields
            .iter()
            .map(|field| match *field {
                LATITUDE_FIELD => Ok(((*field).to_string(), lat)),
                LONGITUDE_FIELD => Ok(((*field).to_string(), lon)),
                other => Err(TelemetryError::MissingField(other.to_string())),
            })
            .collect()
    }
}

/// Factory handing every session the same shared mock.
pub struct SharedTelemetryFactory(pub Arc<MockTelemetry>);

impl TelemetryFactory for SharedTelemetryFactory {
    fn create(&self) -> Arc<dyn TelemetrySource> {
        self.0.clone()
    }
}

/// Geocoder that replays a script of results. The last entry repeats.
pub struct MockGeocoder {
    script: Mutex<VecDeque<Result<Address, ServiceError>>>,
    positions: Mutex<Vec<Position>>,
}

impl MockGeocoder {
    pub fn new(script: Vec<Result<Address, ServiceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            positions: Mutex::new(Vec::new()),
        }
    }

    /// Always resolve to the given address levels.
    pub fn fixed(city: &str, state: &str, country: &str) -> Self {
        Self::new(vec![Ok(address(city, state, country))])
    }

    pub fn calls(&self) -> usize {
        self.positions.lock().len()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.positions.lock().clone()
    }
}

/// Convenience constructor for a fully populated address.
pub fn address(city: &str, state: &str, country: &str) -> Address {
    Address {
        city: Some(city.into()),
        state: Some(state.into()),
        country: Some(country.into()),
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn reverse(&self, position: Position) -> Result<Address, ServiceError> {
        self.positions.lock().push(position);
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.pop_front().unwrap_or(Err(ServiceError::Network("script empty".into())))
        } else {
            script
                .front()
                .cloned()
                .unwrap_or(Err(ServiceError::Network("script empty".into())))
        }
    }
}

/// A scripted completion reply.
#[derive(Clone, Debug)]
pub enum MockReply {
    Text(String),
    Error(ServiceError),
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delayed(delay, Box::new(inner))
    }
}

/// Completion provider answering by prompt substring. First matching rule wins;
/// prompts matching no rule fail.
pub struct MockCompletion {
    rules: Vec<(String, MockReply)>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, needle: impl Into<String>, reply: MockReply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        self.prompts.lock().push(prompt.to_string());
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| MockReply::Error(ServiceError::Status {
                status: 404,
                body: "no mock rule".into(),
            }));

        let mut current = reply;
        loop {
            match current {
                MockReply::Text(text) => return Ok(text),
                MockReply::Error(e) => return Err(e),
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    current = *inner;
                }
            }
        }
    }
}

/// Image search answering from a title map. Unknown titles return no images.
pub struct MockImageSearch {
    results: HashMap<String, Result<Vec<String>, ServiceError>>,
    queries: Mutex<Vec<String>>,
}

impl MockImageSearch {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, title: &str, result: Result<Vec<String>, ServiceError>) -> Self {
        self.results.insert(title.to_string(), result);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl Default for MockImageSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageSearch for MockImageSearch {
    async fn search(&self, title: &str, limit: usize) -> Result<Vec<String>, ServiceError> {
        self.queries.lock().push(title.to_string());
        match self.results.get(title) {
            Some(Ok(urls)) => Ok(urls.iter().take(limit).cloned().collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(Vec::new()),
        }
    }
}
