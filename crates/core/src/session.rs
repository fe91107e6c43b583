//! Session state mirror.
//!
//! The backend owns the learner's session; the client keeps the last-known
//! values and shallow-merges each reply's partial `state` object into them.
//! Values are stored exactly as reported and only clamped for display.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-topic proficiency, as computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMastery {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default = "default_topic_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elo_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bkt_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_correctness: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub learning_objectives_met: Vec<String>,
}

fn default_topic_status() -> String {
    "not_started".to_string()
}

impl Default for TopicMastery {
    fn default() -> Self {
        Self {
            score: 0.0,
            attempts: 0,
            status: default_topic_status(),
            elo_score: None,
            bkt_score: None,
            last_correctness: None,
            last_updated: None,
            learning_objectives_met: Vec::new(),
        }
    }
}

/// Last-known session metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub frustration_level: f64,
    pub engagement_score: f64,
    pub sentiment: String,
    pub global_mastery_score: f64,
    pub mastery_levels: BTreeMap<String, TopicMastery>,
    pub current_topic: String,
    pub session_id: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            frustration_level: 0.0,
            engagement_score: 0.5,
            sentiment: "neutral".to_string(),
            global_mastery_score: 0.0,
            mastery_levels: BTreeMap::new(),
            current_topic: "General".to_string(),
            session_id: String::new(),
        }
    }
}

/// Partial update carried in a reply's `state` object. Keys the client does
/// not mirror (syllabus, routing hints, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frustration_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_mastery_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastery_levels: Option<BTreeMap<String, TopicMastery>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Shallow field-wise override: absent fields keep `old`, present fields
/// (zero and empty included) replace it. `mastery_levels` is replaced as a
/// whole map.
pub fn merge(old: &SessionState, patch: &SessionPatch) -> SessionState {
    let mut next = old.clone();
    next.apply(patch);
    next
}

impl SessionState {
    /// In-place form of [`merge`].
    pub fn apply(&mut self, patch: &SessionPatch) {
        if let Some(v) = patch.frustration_level {
            self.frustration_level = v;
        }
        if let Some(v) = patch.engagement_score {
            self.engagement_score = v;
        }
        if let Some(v) = &patch.sentiment {
            self.sentiment = v.clone();
        }
        if let Some(v) = patch.global_mastery_score {
            self.global_mastery_score = v;
        }
        if let Some(v) = &patch.mastery_levels {
            self.mastery_levels = v.clone();
        }
        if let Some(v) = &patch.current_topic {
            self.current_topic = v.clone();
        }
        if let Some(v) = &patch.session_id {
            self.session_id = v.clone();
        }
    }

    /// Topics ordered by descending score, ties broken by name.
    pub fn topics_by_score(&self) -> Vec<(&str, &TopicMastery)> {
        let mut topics: Vec<(&str, &TopicMastery)> = self
            .mastery_levels
            .iter()
            .map(|(name, m)| (name.as_str(), m))
            .collect();
        topics.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        topics
    }
}
