//! Agent Activity Log
//!
//! Every agent step leaves a short "thought / action" note. The log keeps
//! the newest entries first and never holds more than [`LOG_CAPACITY`].

use crate::course::{AgentRole, Module, QuizQuestion};
use crate::gateway::{ContentEvaluation, FeedbackAnalysis, SupervisorDecision};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Maximum number of entries retained.
pub const LOG_CAPACITY: usize = 50;

/// The structured result attached to a log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum LogPayload {
    Decision(SupervisorDecision),
    Curriculum(Vec<Module>),
    Evaluation(ContentEvaluation),
    Assessment(Vec<QuizQuestion>),
    Feedback(FeedbackAnalysis),
    /// A recorded quiz score in `[0, 1]`.
    Score(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub agent: AgentRole,
    pub thought: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<LogPayload>,
}

impl AgentLog {
    pub fn new(agent: AgentRole, thought: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            agent,
            thought: thought.into(),
            action: action.into(),
            result: None,
        }
    }

    pub fn with_result(mut self, result: LogPayload) -> Self {
        self.result = Some(result);
        self
    }
}

/// Newest-first, bounded list of [`AgentLog`] entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<AgentLog>", into = "Vec<AgentLog>")]
pub struct ActivityLog {
    entries: VecDeque<AgentLog>,
}

impl ActivityLog {
    /// Prepends `entry`, evicting the oldest entry once the log is full.
    pub fn record(&mut self, entry: AgentLog) {
        self.entries.push_front(entry);
        self.entries.truncate(LOG_CAPACITY);
    }

    pub fn latest(&self) -> Option<&AgentLog> {
        self.entries.front()
    }

    /// Iterates from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &AgentLog> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<AgentLog>> for ActivityLog {
    /// Expects newest-first order; anything past the capacity is dropped.
    fn from(mut entries: Vec<AgentLog>) -> Self {
        entries.truncate(LOG_CAPACITY);
        Self {
            entries: entries.into(),
        }
    }
}

impl From<ActivityLog> for Vec<AgentLog> {
    fn from(log: ActivityLog) -> Self {
        log.entries.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> AgentLog {
        AgentLog::new(AgentRole::Supervisor, format!("thought {n}"), format!("action {n}"))
    }

    #[test]
    fn test_newest_entry_comes_first() {
        let mut log = ActivityLog::default();
        log.record(entry(1));
        log.record(entry(2));

        let thoughts: Vec<_> = log.iter().map(|e| e.thought.as_str()).collect();
        assert_eq!(thoughts, vec!["thought 2", "thought 1"]);
        assert_eq!(log.latest().unwrap().action, "action 2");
    }

    #[test]
    fn test_fifty_first_entry_evicts_the_oldest() {
        let mut log = ActivityLog::default();
        for n in 1..=LOG_CAPACITY {
            log.record(entry(n));
        }
        assert_eq!(log.len(), LOG_CAPACITY);
        assert_eq!(log.iter().last().unwrap().thought, "thought 1");

        log.record(entry(LOG_CAPACITY + 1));

        assert_eq!(log.len(), LOG_CAPACITY);
        assert_eq!(log.latest().unwrap().thought, "thought 51");
        assert_eq!(log.iter().last().unwrap().thought, "thought 2");
        assert!(log.iter().all(|e| e.thought != "thought 1"));
    }

    #[test]
    fn test_deserializing_an_oversized_log_keeps_the_newest() {
        let entries: Vec<AgentLog> = (0..60).rev().map(entry).collect();
        let json = serde_json::to_string(&entries).unwrap();

        let log: ActivityLog = serde_json::from_str(&json).unwrap();

        assert_eq!(log.len(), LOG_CAPACITY);
        assert_eq!(log.latest().unwrap().thought, "thought 59");
    }

    #[test]
    fn test_payload_is_tagged_by_kind() {
        let log = entry(1).with_result(LogPayload::Score(0.5));
        let json = serde_json::to_value(&log).unwrap();

        assert_eq!(json["result"]["kind"], "score");
        assert_eq!(json["result"]["data"], 0.5);
        assert_eq!(json["agent"], "Supervisor");
    }
}
