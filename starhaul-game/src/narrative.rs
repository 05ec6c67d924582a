//! Best-effort flavour text for log lines.
//!
//! State transitions commit a deterministic fallback line first and queue a
//! [`NarrativeRequest`]. After the step finishes, the session hands queued
//! requests to a [`NarrativeSource`]; a successful reply annotates the line,
//! a failure leaves the fallback in place. Nothing here can alter game state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    #[error("narrative source unavailable: {0}")]
    Unavailable(String),
    #[error("narrative source returned an empty line")]
    Empty,
}

/// Turns a short context string into a dramatised line.
pub trait NarrativeSource {
    /// # Errors
    ///
    /// Any failure is recovered by keeping the fallback line.
    fn narrate(&mut self, context: &str) -> Result<String, NarrativeError>;
}

/// One entry of a player-facing log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl LogLine {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            narrative: None,
        }
    }

    /// Narrative when one arrived, otherwise the committed fallback.
    #[must_use]
    pub fn display(&self) -> &str {
        self.narrative.as_deref().unwrap_or(&self.text)
    }
}

/// Which log a queued request annotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeTarget {
    Expedition(u64),
    Autopilot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeRequest {
    pub target: NarrativeTarget,
    pub line_index: usize,
    pub context: String,
}

/// Requests waiting for enrichment. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrativeQueue {
    pending: Vec<NarrativeRequest>,
}

impl NarrativeQueue {
    pub fn push(&mut self, target: NarrativeTarget, line_index: usize, context: impl Into<String>) {
        self.pending.push(NarrativeRequest {
            target,
            line_index,
            context: context.into(),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, NarrativeRequest> {
        self.pending.drain(..)
    }
}

/// `HH:MM:SS` of a millisecond timestamp, UTC.
#[must_use]
pub fn clock_stamp(now_ms: u64) -> String {
    i64::try_from(now_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(|| "--:--:--".to_string(), |at| at.format("%H:%M:%S").to_string())
}

#[must_use]
pub fn event_fallback(context: &str) -> String {
    format!("Log: Event resolved. ({context})")
}

#[must_use]
pub fn autopilot_fallback(now_ms: u64, location_name: &str, context: &str) -> String {
    format!(
        "[{}] Autopilot returned from {location_name}. {context}",
        clock_stamp(now_ms)
    )
}

/// Ask `source` for a line and attach it. Returns whether the line changed.
pub fn annotate<N>(line: &mut LogLine, source: &mut N, context: &str) -> bool
where
    N: NarrativeSource + ?Sized,
{
    match source.narrate(context) {
        Ok(text) if !text.trim().is_empty() => {
            line.narrative = Some(text.trim().to_string());
            true
        }
        Ok(_) => {
            log::warn!("{}", NarrativeError::Empty);
            false
        }
        Err(err) => {
            log::warn!("keeping fallback log line: {err}");
            false
        }
    }
}

/// Source used when no collaborator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNarrator;

impl NarrativeSource for NoNarrator {
    fn narrate(&mut self, _context: &str) -> Result<String, NarrativeError> {
        Err(NarrativeError::Unavailable("no narrator configured".to_string()))
    }
}

/// Offline narrator that dresses the context in a rotating set of openers.
#[derive(Debug, Clone, Default)]
pub struct TemplateNarrator {
    calls: usize,
}

const OPENERS: [&str; 4] = [
    "The comms crackle:",
    "Captain's log:",
    "Sensors settle as the crew reports:",
    "Against the hum of the reactor,",
];

impl NarrativeSource for TemplateNarrator {
    fn narrate(&mut self, context: &str) -> Result<String, NarrativeError> {
        let context = context.trim();
        if context.is_empty() {
            return Err(NarrativeError::Empty);
        }
        let opener = OPENERS[self.calls % OPENERS.len()];
        self.calls += 1;
        Ok(format!("{opener} {context}"))
    }
}
