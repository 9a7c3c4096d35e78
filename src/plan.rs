//! Reference audit for generated reading-plan content.
//!
//! Plan content comes from an untrusted generator. Every reference in it is
//! checked with the validator before the plan is stored. The problems found
//! are rendered as correction lines the generator can be re-prompted with.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{Result, ScripRefError};
use crate::reference::validate_reference;

/// One day of a reading plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyReading {
    pub day: u32,
    pub reference: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
struct PlanContent {
    #[serde(default)]
    daily_verses: Vec<DailyReading>,
}

/// A reference that failed the audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanIssue {
    /// The offending reference piece, or `Day N` when the entry had none.
    pub key: String,
    pub reason: String,
}

/// Problems found in a plan, in the order they were encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanAudit {
    pub issues: Vec<PlanIssue>,
}

impl PlanAudit {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// One `- '<reference>': <reason>` line per problem.
    pub fn feedback(&self) -> String {
        self.issues
            .iter()
            .map(|issue| format!("- '{}': {}\n", issue.key, issue.reason))
            .collect()
    }

    fn record(&mut self, key: String, reason: String) {
        // The same bad piece on several days is reported once.
        if self.issues.iter().any(|issue| issue.key == key) {
            return;
        }
        self.issues.push(PlanIssue { key, reason });
    }
}

/// Parses generator output of the form `{"daily_verses": [...]}`.
///
/// A surrounding ```` ```json ```` fence is stripped first. Content with no
/// entries is rejected.
pub fn parse_plan_content(raw: &str) -> Result<Vec<DailyReading>> {
    let mut body = raw.trim();
    if let Some(stripped) = body.strip_prefix("```json") {
        body = stripped.strip_suffix("```").unwrap_or(stripped).trim();
    }

    let content: PlanContent = serde_json::from_str(body).map_err(|e| ScripRefError::Plan {
        message: format!("plan content is not valid JSON: {e}"),
    })?;

    if content.daily_verses.is_empty() {
        return Err(ScripRefError::Plan {
            message: "plan content has an empty 'daily_verses' array".to_string(),
        });
    }
    debug!(days = content.daily_verses.len(), "parsed plan content");
    Ok(content.daily_verses)
}

/// Validates every reference in `readings`.
///
/// Entries are keyed by position (`Day 1` is the first entry) when their
/// reference is blank. Otherwise each comma-separated piece is validated on
/// its own.
pub fn audit_plan(readings: &[DailyReading]) -> PlanAudit {
    let mut audit = PlanAudit::default();

    for (position, reading) in readings.iter().enumerate() {
        if reading.reference.trim().is_empty() {
            audit.record(
                format!("Day {}", position + 1),
                "reference field is empty".to_string(),
            );
            continue;
        }

        for piece in reading.reference.split(',').map(str::trim) {
            if piece.is_empty() {
                continue;
            }
            if let Err(invalid) = validate_reference(piece) {
                audit.record(piece.to_string(), invalid.to_string());
            }
        }
    }

    if !audit.is_clean() {
        warn!(problems = audit.issues.len(), "plan contains invalid references");
    }
    audit
}
