use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Free-form metadata attached to memories and agents.
pub type Metadata = Map<String, Value>;

/// Metadata keys that attribute a memory to an agent. Both spellings occur in
/// client code, so filters and attribution treat them as one key.
pub const AGENT_ID_KEYS: [&str; 2] = ["agent_id", "agentId"];

/// Confidence assumed for memories that carry no `confidence` metadata.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Memory {
    pub fn new(content: String, metadata: Metadata) -> Self {
        let now = Utc::now();
        Self {
            id: new_memory_id(),
            content,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Agent this memory is attributed to, if any.
    pub fn agent_id(&self) -> Option<&str> {
        AGENT_ID_KEYS
            .iter()
            .find_map(|key| self.metadata.get(*key))
            .and_then(Value::as_str)
    }

    /// Contributor-declared confidence, clamped to [0, 1].
    pub fn confidence(&self) -> f64 {
        self.metadata
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0))
    }

    /// Apply a partial update. Metadata is merged, not replaced.
    pub fn apply_update(&mut self, content: Option<String>, metadata: Option<Metadata>) {
        if let Some(content) = content {
            self.content = content;
        }
        if let Some(patch) = metadata {
            merge_metadata(&mut self.metadata, patch);
        }
        self.updated_at = Utc::now();
    }

    /// True when every key in `filter` has an equal value on this memory.
    pub fn matches_filter(&self, filter: &Metadata) -> bool {
        filter.iter().all(|(key, expected)| {
            if AGENT_ID_KEYS.contains(&key.as_str()) {
                return AGENT_ID_KEYS
                    .iter()
                    .filter_map(|k| self.metadata.get(*k))
                    .any(|actual| values_equal(actual, expected));
            }
            self.metadata
                .get(key)
                .is_some_and(|actual| values_equal(actual, expected))
        })
    }

    /// Text used for lexical matching: content plus descriptive metadata values.
    ///
    /// Identifier and timestamp fields are left out so that ids such as
    /// `user_123` do not dominate relevance.
    pub fn searchable_text(&self) -> String {
        let mut text = self.content.clone();
        for (key, value) in &self.metadata {
            if is_identifier_key(key) {
                continue;
            }
            if let Value::String(s) = value {
                text.push(' ');
                text.push_str(s);
            }
        }
        text
    }
}

/// Shallow merge. A `null` in the patch removes the key.
pub fn merge_metadata(target: &mut Metadata, patch: Metadata) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

pub fn new_memory_id() -> String {
    format!("mem_{}", Uuid::new_v4().simple())
}

fn is_identifier_key(key: &str) -> bool {
    if key.ends_with("Id") || key.ends_with("At") {
        return true;
    }
    let key = key.to_ascii_lowercase();
    key == "id"
        || key.ends_with("_id")
        || key.ends_with("_at")
        || key.starts_with("last_")
        || key.contains("timestamp")
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => Metadata::new(),
        }
    }

    #[test]
    fn update_merges_metadata_and_keeps_other_fields() {
        let mut memory = Memory::new(
            "User prefers dark mode interface".into(),
            metadata(json!({"category": "user_preferences", "importance": "high"})),
        );
        let created_at = memory.created_at;

        memory.apply_update(
            None,
            Some(metadata(json!({"importance": "critical", "last_confirmed": "2024-01-01"}))),
        );

        assert_eq!(memory.content, "User prefers dark mode interface");
        assert_eq!(memory.metadata["category"], "user_preferences");
        assert_eq!(memory.metadata["importance"], "critical");
        assert_eq!(memory.metadata["last_confirmed"], "2024-01-01");
        assert_eq!(memory.created_at, created_at);
        assert!(memory.updated_at >= created_at);
    }

    #[test]
    fn null_in_patch_removes_key() {
        let mut memory = Memory::new("x".into(), metadata(json!({"a": 1, "b": 2})));
        memory.apply_update(None, Some(metadata(json!({"a": null}))));
        assert!(!memory.metadata.contains_key("a"));
        assert_eq!(memory.metadata["b"], 2);
    }

    #[test]
    fn agent_id_accepts_both_spellings() {
        let snake = Memory::new("x".into(), metadata(json!({"agent_id": "web-researcher"})));
        let camel = Memory::new("x".into(), metadata(json!({"agentId": "web-researcher"})));
        assert_eq!(snake.agent_id(), Some("web-researcher"));
        assert_eq!(camel.agent_id(), Some("web-researcher"));

        let filter = metadata(json!({"agent_id": "web-researcher"}));
        assert!(camel.matches_filter(&filter));
    }

    #[test]
    fn filter_requires_every_key() {
        let memory = Memory::new(
            "x".into(),
            metadata(json!({"user_id": "user_123", "turn": 2})),
        );
        assert!(memory.matches_filter(&metadata(json!({"user_id": "user_123"}))));
        assert!(memory.matches_filter(&metadata(json!({"turn": 2.0}))));
        assert!(!memory.matches_filter(&metadata(json!({"user_id": "user_123", "session_id": "s"}))));
        assert!(memory.matches_filter(&Metadata::new()));
    }

    #[test]
    fn confidence_defaults_and_clamps() {
        let none = Memory::new("x".into(), Metadata::new());
        let high = Memory::new("x".into(), metadata(json!({"confidence": 1.7})));
        assert!((none.confidence() - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
        assert!((high.confidence() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn searchable_text_skips_identifiers() {
        let memory = Memory::new(
            "User timezone is PST".into(),
            metadata(json!({"category": "user_preferences", "user_id": "user_123", "session_id": "s1"})),
        );
        let text = memory.searchable_text();
        assert!(text.contains("user_preferences"));
        assert!(!text.contains("user_123"));
        assert!(!text.contains("s1"));
    }
}
