//! Command records: the persisted unit of work
//!
//! A record is created by an external writer in the pending state and is
//! answered exactly once by the dispatcher. The response is the single
//! source of truth for "already handled".

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::schedule::Progress;

/// A single command in the store.
///
/// Only `name` is strictly typed. Writer metadata (`id`, `created_at`) and
/// any unknown keys are kept verbatim, so one odd record cannot make the
/// whole store unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Value>,

    name: String,

    #[serde(default)]
    request: Request,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<Response>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl CommandRecord {
    /// Create a pending command addressed to the named receiver
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            request: Request::default(),
            response: None,
            extra: Map::new(),
        }
    }

    /// Attach a request body
    pub fn with_body(mut self, body: Value) -> Self {
        self.request.body = Some(body).filter(|body| !body.is_null());
        self
    }

    /// Attach an execution condition
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.request.schedule = Some(schedule);
        self
    }

    pub(crate) fn with_id(mut self, id: uuid::Uuid) -> Self {
        self.id = Some(Value::String(id.to_string()));
        self
    }

    pub(crate) fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.request.created_at = Some(Value::String(created_at.to_rfc3339()));
        self
    }

    /// Identifier assigned by the writer, if it is a UUID
    pub fn id(&self) -> Option<uuid::Uuid> {
        self.id
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|id| uuid::Uuid::parse_str(id).ok())
    }

    /// Identifier exactly as stored, whatever its type
    pub fn raw_id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Name of the receiver that should handle this command
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request payload
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Response, present once the command has been handled
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Whether the command has reached its terminal state
    pub fn is_answered(&self) -> bool {
        self.response.is_some()
    }

    /// Record the outcome. Answered records are never overwritten.
    pub(crate) fn answer(&mut self, response: Response) -> bool {
        if self.response.is_some() {
            return false;
        }
        self.response = Some(response);
        true
    }
}

/// Request payload of a command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Arbitrary data passed to the receiver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Condition gating execution; absent means "as soon as seen"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,

    /// When the writer created the command, as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,

    /// Keys this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Request {
    /// Creation time, if it is an RFC 3339 string or a naive ISO 8601
    /// timestamp (read as UTC)
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let text = self.created_at.as_ref()?.as_str()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Execution condition matched against the host's progress counters.
///
/// `value` is kept as written; only non-negative integral numbers can match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Which counter to compare
    pub key: ScheduleKey,
    /// Counter value at which the command runs
    #[serde(default)]
    pub value: Value,
}

impl Schedule {
    /// Run when the epoch counter equals `value`
    pub fn epoch(value: i64) -> Self {
        Self {
            key: ScheduleKey::Epoch,
            value: Value::from(value),
        }
    }

    /// Run when the iteration counter equals `value`
    pub fn iteration(value: i64) -> Self {
        Self {
            key: ScheduleKey::Iteration,
            value: Value::from(value),
        }
    }

    /// Target counter value, if `value` is a non-negative integral number
    pub fn target(&self) -> Option<u64> {
        if let Some(n) = self.value.as_u64() {
            return Some(n);
        }
        let f = self.value.as_f64()?;
        if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
            Some(f as u64)
        } else {
            None
        }
    }
}

/// Counter named by a schedule.
///
/// Unrecognized keys are kept verbatim so the store round-trips; they never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScheduleKey {
    /// Host epoch counter
    Epoch,
    /// Host iteration counter
    Iteration,
    /// Any other key
    Other(String),
}

impl ScheduleKey {
    /// Key as written in the store
    pub fn as_str(&self) -> &str {
        match self {
            ScheduleKey::Epoch => "epoch",
            ScheduleKey::Iteration => "iteration",
            ScheduleKey::Other(key) => key,
        }
    }
}

impl From<String> for ScheduleKey {
    fn from(key: String) -> Self {
        match key.as_str() {
            "epoch" => ScheduleKey::Epoch,
            "iteration" => ScheduleKey::Iteration,
            _ => ScheduleKey::Other(key),
        }
    }
}

impl From<ScheduleKey> for String {
    fn from(key: ScheduleKey) -> Self {
        match key {
            ScheduleKey::Other(key) => key,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a handled command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Receiver returned normally
    #[serde(alias = "SUCCESS")]
    Success,
    /// Receiver failed or was not found
    #[serde(alias = "FAILURE")]
    Failure,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Success => f.write_str("success"),
            ResponseStatus::Failure => f.write_str("failure"),
        }
    }
}

/// Response written by the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Success or failure
    pub status: ResponseStatus,

    /// Receiver's return value; always absent on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Wall-clock time of execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,

    /// Host epoch at execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,

    /// Host iteration at execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u64>,

    /// Host elapsed time in seconds at execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
}

impl Response {
    /// Successful response carrying the receiver's return value
    pub fn success(body: Option<Value>) -> Self {
        Self {
            status: ResponseStatus::Success,
            body: body.filter(|body| !body.is_null()),
            executed_at: None,
            epoch: None,
            iteration: None,
            elapsed_time: None,
        }
    }

    /// Failure response; carries no body
    pub fn failure() -> Self {
        Self {
            status: ResponseStatus::Failure,
            body: None,
            executed_at: None,
            epoch: None,
            iteration: None,
            elapsed_time: None,
        }
    }

    /// Stamp the response with execution time and host progress
    pub fn stamped(mut self, progress: Progress, elapsed_time: Option<f64>) -> Self {
        self.executed_at = Some(Utc::now());
        self.epoch = Some(progress.epoch);
        self.iteration = Some(progress.iteration);
        self.elapsed_time = elapsed_time;
        self
    }

    /// Whether the receiver succeeded
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
