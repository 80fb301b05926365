use serde::{Deserialize, Serialize};

/// User identifier recorded when the submitter did not provide one.
pub const ANONYMOUS_USER: &str = "anonymous";

/// One persisted leaderboard entry: a completed session's representative
/// latency plus the location it was submitted from. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredResult {
    /// Submission time, milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    /// Representative latency in milliseconds.
    #[serde(rename = "reactionTime")]
    pub reaction_time_ms: u32,
    /// Submitting user.
    #[serde(default = "anonymous")]
    pub user_id: String,
    /// ISO country code, `"UN"` when unknown.
    pub country_code: String,
    /// Region within the country, `"Unknown"` when unknown.
    pub region: String,
    /// City name, `"Unknown"` when unknown.
    pub city: String,
}

fn anonymous() -> String {
    ANONYMOUS_USER.to_string()
}

/// Every stored result of one test type, persisted as a single JSON array.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ResultStore {
    /// Results in submission order.
    pub entries: Vec<StoredResult>,
}

impl ResultStore {
    /// Wrap existing entries.
    pub fn new(entries: Vec<StoredResult>) -> Self {
        Self { entries }
    }

    /// Drop entries strictly older than `cutoff_ms`, returning how many went.
    pub fn prune_before(&mut self, cutoff_ms: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.timestamp_ms >= cutoff_ms);
        before - self.entries.len()
    }

    /// Append a new entry.
    pub fn push(&mut self, entry: StoredResult) {
        self.entries.push(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_entries_without_user_id() {
        let raw = r#"[{"timestamp":1,"reactionTime":210,
            "countryCode":"FR","region":"IDF","city":"Paris"}]"#;
        let store: ResultStore = serde_json::from_str(raw).unwrap();
        assert_eq!(store.entries[0].user_id, ANONYMOUS_USER);
        assert_eq!(store.entries[0].reaction_time_ms, 210);
    }

    #[test]
    fn prune_keeps_entries_at_the_cutoff() {
        let entry = |timestamp_ms| StoredResult {
            timestamp_ms,
            reaction_time_ms: 200,
            user_id: anonymous(),
            country_code: "UN".into(),
            region: "Unknown".into(),
            city: "Unknown".into(),
        };
        let mut store = ResultStore::new(vec![entry(99), entry(100), entry(101)]);
        assert_eq!(store.prune_before(100), 1);
        assert_eq!(store.len(), 2);
    }
}
