//! Persisted tour progress.
//!
//! The record is a single JSON object `{ "active": bool, "step": number }`
//! stored under a fixed key. Reads never fail: anything absent or malformed
//! comes back as the inactive default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Durable `{active, step}` record owned by the tour controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourState {
    pub active: bool,
    pub step: usize,
}

impl TourState {
    pub fn active_at(step: usize) -> Self {
        Self { active: true, step }
    }

    pub fn inactive() -> Self {
        Self::default()
    }

    /// Parse a stored record leniently.
    ///
    /// `active` follows truthiness; `step` accepts any finite number (or a
    /// numeric string), flooring fractions and mapping negatives to zero.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let Value::Object(map) = value else {
            return None;
        };

        let active = map.get("active").is_some_and(truthy);
        let step = map.get("step").and_then(as_step).unwrap_or(0);
        Some(Self { active, step })
    }

    pub fn to_json(&self) -> String {
        // A struct of a bool and an integer always serializes
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"active":false,"step":0}"#.into())
    }

    /// Step index clamped into `[0, len - 1]`
    pub fn clamped_step(&self, len: usize) -> usize {
        self.step.min(len.saturating_sub(1))
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn as_step(value: &Value) -> Option<usize> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.max(0.0).floor() as usize)
}

/// Durable storage for the tour record
pub trait StateStore {
    /// Current record; absent or malformed data yields the inactive default
    fn read(&self) -> TourState;

    /// Overwrite the record. Failures are logged, never surfaced.
    fn write(&mut self, state: TourState);

    /// Raw stored text, if any (diagnostics only)
    fn raw(&self) -> Option<String>;
}

/// File-backed store: one JSON file per key inside the state directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    key: String,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }
}

impl StateStore for JsonFileStore {
    fn read(&self) -> TourState {
        let Some(contents) = self.raw() else {
            return TourState::default();
        };
        TourState::parse(&contents).unwrap_or_else(|| {
            tracing::warn!(path = %self.path().display(), "Malformed tour state, using defaults");
            TourState::default()
        })
    }

    fn write(&mut self, state: TourState) {
        let result = fs::create_dir_all(&self.dir)
            .and_then(|()| fs::write(self.path(), state.to_json()));
        if let Err(err) = result {
            tracing::warn!(path = %self.path().display(), error = %err, "Failed to persist tour state");
        }
    }

    fn raw(&self) -> Option<String> {
        fs::read_to_string(self.path()).ok()
    }
}

/// In-memory key-value store, shared between clones.
///
/// Behaves like browser local storage: clones see each other's writes, so a
/// "reloaded" controller can be handed a clone of the previous page's store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
    key: String,
}

impl MemoryStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            key: key.into(),
        }
    }

    /// Store raw text under the tour key, bypassing serialization
    pub fn set_raw(&self, raw: impl Into<String>) {
        if let Ok(mut items) = self.items.lock() {
            items.insert(self.key.clone(), raw.into());
        }
    }

    pub fn remove(&self) {
        if let Ok(mut items) = self.items.lock() {
            items.remove(&self.key);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("bpTourState")
    }
}

impl StateStore for MemoryStore {
    fn read(&self) -> TourState {
        self.raw()
            .and_then(|raw| TourState::parse(&raw))
            .unwrap_or_default()
    }

    fn write(&mut self, state: TourState) {
        self.set_raw(state.to_json());
    }

    fn raw(&self) -> Option<String> {
        self.items.lock().ok()?.get(&self.key).cloned()
    }
}
