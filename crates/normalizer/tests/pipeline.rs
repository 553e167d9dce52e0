use common::config::NormalizerConfig;
use normalizer::{
    assemble, DomainNormalizer, EventKind, EventStats, NormalizeError, Payload, RecordKind,
};
use serde_json::{json, Value};

fn api_event(id: &str, event_type: &str, payload: Value) -> Value {
    json!({
        "id": id,
        "type": event_type,
        "actor": {"id": 1, "login": "octo", "avatar_url": "", "url": ""},
        "repo": {"id": 7, "name": "octo/hello", "url": ""},
        "payload": payload,
        "public": true,
        "created_at": "2024-01-01T00:00:00Z"
    })
}

#[test]
fn extraction_profile_end_to_end() {
    let normalizer = DomainNormalizer::new(NormalizerConfig::default());
    let converted =
        normalizer.user_profiles(&[json!({"username": "", "login": "octo", "followers": "1,024"})]);
    assert!(converted.failures.is_empty());
    let profile = &converted.items[0];
    assert_eq!(profile.username, "octo");
    assert_eq!(profile.stats.followers, 1024);
}

#[test]
fn api_watch_event_end_to_end() {
    let event = assemble(&api_event("1", "WatchEvent", json!({}))).unwrap();
    match event.payload() {
        Payload::Watch(watch) => assert_eq!(watch.action, "started"),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn api_batch_skips_malformed_records() {
    let mut broken = api_event("2", "PushEvent", json!({"size": "x"}));
    broken.as_object_mut().unwrap().remove("created_at");
    let records = vec![
        api_event("1", "PushEvent", json!({"size": "x"})),
        broken,
        api_event("3", "SomethingNewEvent", json!({"action": "did", "extra": [1, 2]})),
    ];

    let mut events = Vec::new();
    let mut malformed = Vec::new();
    for record in &records {
        match assemble(record) {
            Ok(event) => events.push(event),
            Err(err @ NormalizeError::MalformedRecord(_)) => malformed.push(err),
            Err(other) => panic!("unexpected error {other}"),
        }
    }
    assert_eq!(events.len(), 2);
    assert_eq!(malformed.len(), 1);

    let Payload::Push(push) = events[0].payload() else {
        panic!("expected push payload");
    };
    assert_eq!(push.commit_count, 0);

    let Payload::Generic(generic) = events[1].payload() else {
        panic!("expected generic payload");
    };
    assert_eq!(generic.action.as_deref(), Some("did"));
    assert_eq!(generic.extra["extra"], json!([1, 2]));

    let stats = EventStats::from_events(&events);
    assert_eq!(stats.total_events, 2);
    assert_eq!(stats.most_active_repository.as_deref(), Some("octo/hello"));
}

#[test]
fn extraction_events_cover_the_known_vocabulary() {
    let normalizer = DomainNormalizer::new(NormalizerConfig::default());
    let records: Vec<Value> = ["push", "star", "fork", "issue", "pull_request", "release"]
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            json!({
                "type": kind,
                "timestamp": format!("2024-01-0{}T00:00:00Z", i + 1),
                "actor_username": "octo",
                "repository_name": "octo/hello"
            })
        })
        .collect();
    let converted = normalizer.events(&records);
    assert!(converted.failures.is_empty());
    let kinds: Vec<Option<EventKind>> = converted
        .items
        .iter()
        .map(|event| event.payload().kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            Some(EventKind::Push),
            Some(EventKind::Watch),
            Some(EventKind::Fork),
            Some(EventKind::Issues),
            Some(EventKind::PullRequest),
            Some(EventKind::Release),
        ]
    );
}

#[test]
fn canonical_maps_serialize_to_the_same_json_as_domain_values() {
    let normalizer = DomainNormalizer::new(NormalizerConfig::default());
    let raw = json!({
        "name": "hello",
        "owner_username": "octo",
        "stars": "12",
        "language": "Rust",
        "created_at": "2020-01-01T00:00:00Z",
        "updated_at": "2021-01-01T00:00:00Z"
    });
    let map = normalizer.convert(RecordKind::Repository, &raw).unwrap();
    let repo = normalizer.repositories(&[raw]).items.remove(0);
    assert_eq!(serde_json::to_value(&repo).unwrap(), Value::Object(map));
}
