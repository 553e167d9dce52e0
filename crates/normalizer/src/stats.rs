use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::Event;

/// Aggregate view over a set of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStats {
    pub total_events: usize,
    pub events_by_type: BTreeMap<String, usize>,
    /// Repository with the most events; ties go to the one seen first.
    pub most_active_repository: Option<String>,
    pub latest_event_at: Option<DateTime<Utc>>,
}

impl EventStats {
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut stats = EventStats::default();
        let mut per_repo: Vec<(&str, usize)> = Vec::new();

        for event in events {
            stats.total_events += 1;
            *stats
                .events_by_type
                .entry(event.event_type().to_string())
                .or_insert(0) += 1;

            let name = event.repo().name.as_str();
            if !name.is_empty() {
                match per_repo.iter_mut().find(|(repo, _)| *repo == name) {
                    Some((_, count)) => *count += 1,
                    None => per_repo.push((name, 1)),
                }
            }

            let created = event.created_at();
            if stats.latest_event_at.map_or(true, |latest| created > latest) {
                stats.latest_event_at = Some(created);
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (repo, count) in per_repo {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((repo, count));
            }
        }
        stats.most_active_repository = best.map(|(repo, _)| repo.to_string());
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::assemble;
    use serde_json::json;

    fn event(id: u32, event_type: &str, repo: &str, created_at: &str) -> Event {
        assemble(&json!({
            "id": id.to_string(),
            "type": event_type,
            "actor": {"id": 1, "login": "octo"},
            "repo": {"id": 2, "name": repo},
            "payload": {},
            "public": true,
            "created_at": created_at
        }))
        .unwrap()
    }

    #[test]
    fn empty_input_has_no_leader() {
        let stats = EventStats::from_events(&Vec::<Event>::new());
        assert_eq!(stats, EventStats::default());
    }

    #[test]
    fn counts_types_and_finds_latest() {
        let events = vec![
            event(1, "PushEvent", "octo/a", "2024-01-01T00:00:00Z"),
            event(2, "PushEvent", "octo/b", "2024-03-01T00:00:00Z"),
            event(3, "WatchEvent", "octo/b", "2024-02-01T00:00:00Z"),
        ];
        let stats = EventStats::from_events(&events);
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.events_by_type["PushEvent"], 2);
        assert_eq!(stats.events_by_type["WatchEvent"], 1);
        assert_eq!(stats.most_active_repository.as_deref(), Some("octo/b"));
        assert_eq!(
            stats.latest_event_at.map(|t| t.to_rfc3339()),
            Some("2024-03-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn tie_goes_to_first_repository_seen() {
        let events = vec![
            event(1, "ForkEvent", "octo/first", "2024-01-01T00:00:00Z"),
            event(2, "ForkEvent", "octo/second", "2024-01-02T00:00:00Z"),
        ];
        let stats = EventStats::from_events(&events);
        assert_eq!(stats.most_active_repository.as_deref(), Some("octo/first"));
    }
}
