//! Discriminator-keyed payload parsing.
//!
//! `dispatch` is total: every known event type maps to exactly one variant and
//! anything else lands in [`Payload::Generic`] with all of its fields retained.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::coerce::{to_count, to_optional_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Push,
    Watch,
    Create,
    Fork,
    Issues,
    PullRequest,
    IssueComment,
    CommitComment,
    PullRequestReview,
    PullRequestReviewComment,
    Delete,
    Release,
    Gollum,
    Member,
    Public,
    Sponsorship,
}

impl EventKind {
    pub const ALL: [EventKind; 16] = [
        EventKind::Push,
        EventKind::Watch,
        EventKind::Create,
        EventKind::Fork,
        EventKind::Issues,
        EventKind::PullRequest,
        EventKind::IssueComment,
        EventKind::CommitComment,
        EventKind::PullRequestReview,
        EventKind::PullRequestReviewComment,
        EventKind::Delete,
        EventKind::Release,
        EventKind::Gollum,
        EventKind::Member,
        EventKind::Public,
        EventKind::Sponsorship,
    ];

    pub fn discriminator(&self) -> &'static str {
        match self {
            EventKind::Push => "PushEvent",
            EventKind::Watch => "WatchEvent",
            EventKind::Create => "CreateEvent",
            EventKind::Fork => "ForkEvent",
            EventKind::Issues => "IssuesEvent",
            EventKind::PullRequest => "PullRequestEvent",
            EventKind::IssueComment => "IssueCommentEvent",
            EventKind::CommitComment => "CommitCommentEvent",
            EventKind::PullRequestReview => "PullRequestReviewEvent",
            EventKind::PullRequestReviewComment => "PullRequestReviewCommentEvent",
            EventKind::Delete => "DeleteEvent",
            EventKind::Release => "ReleaseEvent",
            EventKind::Gollum => "GollumEvent",
            EventKind::Member => "MemberEvent",
            EventKind::Public => "PublicEvent",
            EventKind::Sponsorship => "SponsorshipEvent",
        }
    }

    /// Exact, case-sensitive match against the known discriminators.
    pub fn from_discriminator(discriminator: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.discriminator() == discriminator)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Push(PushPayload),
    Watch(WatchPayload),
    Create(CreatePayload),
    Fork(ForkPayload),
    Issues(IssuesPayload),
    PullRequest(PullRequestPayload),
    IssueComment(IssueCommentPayload),
    CommitComment(CommitCommentPayload),
    PullRequestReview(PullRequestReviewPayload),
    PullRequestReviewComment(PullRequestReviewCommentPayload),
    Delete(DeletePayload),
    Release(ReleasePayload),
    Gollum(GollumPayload),
    Member(MemberPayload),
    Public(PublicPayload),
    Sponsorship(SponsorshipPayload),
    Generic(GenericPayload),
}

impl Payload {
    /// `None` only for [`Payload::Generic`].
    pub fn kind(&self) -> Option<EventKind> {
        let kind = match self {
            Payload::Push(_) => EventKind::Push,
            Payload::Watch(_) => EventKind::Watch,
            Payload::Create(_) => EventKind::Create,
            Payload::Fork(_) => EventKind::Fork,
            Payload::Issues(_) => EventKind::Issues,
            Payload::PullRequest(_) => EventKind::PullRequest,
            Payload::IssueComment(_) => EventKind::IssueComment,
            Payload::CommitComment(_) => EventKind::CommitComment,
            Payload::PullRequestReview(_) => EventKind::PullRequestReview,
            Payload::PullRequestReviewComment(_) => EventKind::PullRequestReviewComment,
            Payload::Delete(_) => EventKind::Delete,
            Payload::Release(_) => EventKind::Release,
            Payload::Gollum(_) => EventKind::Gollum,
            Payload::Member(_) => EventKind::Member,
            Payload::Public(_) => EventKind::Public,
            Payload::Sponsorship(_) => EventKind::Sponsorship,
            Payload::Generic(_) => return None,
        };
        Some(kind)
    }

    pub fn action(&self) -> Option<&str> {
        match self {
            Payload::Watch(p) => Some(p.action.as_str()),
            Payload::Issues(p) => p.action.as_deref(),
            Payload::PullRequest(p) => p.action.as_deref(),
            Payload::IssueComment(p) => p.action.as_deref(),
            Payload::PullRequestReview(p) => p.action.as_deref(),
            Payload::PullRequestReviewComment(p) => p.action.as_deref(),
            Payload::Release(p) => p.action.as_deref(),
            Payload::Member(p) => p.action.as_deref(),
            Payload::Sponsorship(p) => p.action.as_deref(),
            Payload::Generic(p) => p.action.as_deref(),
            Payload::Push(_)
            | Payload::Create(_)
            | Payload::Fork(_)
            | Payload::CommitComment(_)
            | Payload::Delete(_)
            | Payload::Gollum(_)
            | Payload::Public(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub commit_count: u64,
    pub distinct_commit_count: u64,
    pub head_sha: Option<String>,
    pub before_sha: Option<String>,
    pub commit_hashes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchPayload {
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePayload {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub ref_type: Option<String>,
    pub default_branch: Option<String>,
    pub description: Option<String>,
    pub pusher_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForkPayload {
    pub forkee: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuesPayload {
    pub action: Option<String>,
    pub issue: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestPayload {
    pub number: Option<u64>,
    pub action: Option<String>,
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueCommentPayload {
    pub action: Option<String>,
    pub issue: Option<Value>,
    pub comment: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitCommentPayload {
    pub comment: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestReviewPayload {
    pub action: Option<String>,
    pub pull_request: Option<Value>,
    pub review: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestReviewCommentPayload {
    pub action: Option<String>,
    pub pull_request: Option<Value>,
    pub comment: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletePayload {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub ref_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleasePayload {
    pub action: Option<String>,
    pub release: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WikiPage {
    pub page_name: Option<String>,
    pub title: Option<String>,
    pub action: Option<String>,
    pub sha: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GollumPayload {
    pub pages: Vec<WikiPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberPayload {
    pub action: Option<String>,
    pub member: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicPayload {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SponsorshipPayload {
    pub action: Option<String>,
}

/// Catch-all for discriminators outside the known table. `extra` holds every
/// field of the original payload, `action` included, unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericPayload {
    #[serde(skip_serializing)]
    pub action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn dispatch(discriminator: &str, fields: &Map<String, Value>) -> Payload {
    match EventKind::from_discriminator(discriminator) {
        Some(kind) => parse_known(kind, fields),
        None => Payload::Generic(GenericPayload {
            action: to_optional_string(fields.get("action")),
            extra: fields.clone(),
        }),
    }
}

fn parse_known(kind: EventKind, fields: &Map<String, Value>) -> Payload {
    let text = |key: &str| to_optional_string(fields.get(key));
    let snapshot = |key: &str| object(fields, key);

    match kind {
        EventKind::Push => Payload::Push(parse_push(fields)),
        // GitHub only ever emits "started" for stars.
        EventKind::Watch => Payload::Watch(WatchPayload {
            action: "started".to_string(),
        }),
        EventKind::Create => Payload::Create(CreatePayload {
            git_ref: text("ref"),
            ref_type: text("ref_type"),
            default_branch: text("master_branch").or_else(|| text("default_branch")),
            description: text("description"),
            pusher_type: text("pusher_type"),
        }),
        EventKind::Fork => Payload::Fork(ForkPayload {
            forkee: snapshot("forkee"),
        }),
        EventKind::Issues => Payload::Issues(IssuesPayload {
            action: text("action"),
            issue: snapshot("issue"),
        }),
        EventKind::PullRequest => {
            let pull_request = snapshot("pull_request");
            let number = fields
                .get("number")
                .or_else(|| pull_request.as_ref().and_then(|pr| pr.get("number")))
                .filter(|v| !v.is_null())
                .map(|v| to_count(Some(v)));
            Payload::PullRequest(PullRequestPayload {
                number,
                action: text("action"),
                pull_request,
            })
        }
        EventKind::IssueComment => Payload::IssueComment(IssueCommentPayload {
            action: text("action"),
            issue: snapshot("issue"),
            comment: snapshot("comment"),
        }),
        EventKind::CommitComment => Payload::CommitComment(CommitCommentPayload {
            comment: snapshot("comment"),
        }),
        EventKind::PullRequestReview => Payload::PullRequestReview(PullRequestReviewPayload {
            action: text("action"),
            pull_request: snapshot("pull_request"),
            review: snapshot("review"),
        }),
        EventKind::PullRequestReviewComment => {
            Payload::PullRequestReviewComment(PullRequestReviewCommentPayload {
                action: text("action"),
                pull_request: snapshot("pull_request"),
                comment: snapshot("comment"),
            })
        }
        EventKind::Delete => Payload::Delete(DeletePayload {
            git_ref: text("ref"),
            ref_type: text("ref_type"),
        }),
        EventKind::Release => Payload::Release(ReleasePayload {
            action: text("action"),
            release: snapshot("release"),
        }),
        EventKind::Gollum => Payload::Gollum(GollumPayload {
            pages: parse_pages(fields.get("pages")),
        }),
        EventKind::Member => Payload::Member(MemberPayload {
            action: text("action"),
            member: snapshot("member"),
        }),
        EventKind::Public => Payload::Public(PublicPayload {}),
        EventKind::Sponsorship => Payload::Sponsorship(SponsorshipPayload {
            action: text("action"),
        }),
    }
}

fn parse_push(fields: &Map<String, Value>) -> PushPayload {
    let commit_hashes: Vec<String> = match fields.get("commits") {
        Some(Value::Array(commits)) => commits
            .iter()
            .filter_map(|commit| match commit {
                Value::Object(obj) => to_optional_string(obj.get("sha")),
                other => to_optional_string(Some(other)),
            })
            .collect(),
        _ => Vec::new(),
    };

    // An absent size falls back to the listed commits; a present but
    // unparsable one coerces to zero.
    let commit_count = match fields.get("size") {
        None | Some(Value::Null) => commit_hashes.len() as u64,
        size => to_count(size),
    };
    let distinct_commit_count = match fields.get("distinct_size") {
        None | Some(Value::Null) => commit_count,
        size => to_count(size),
    };

    PushPayload {
        git_ref: to_optional_string(fields.get("ref")),
        commit_count,
        distinct_commit_count,
        head_sha: to_optional_string(fields.get("head")),
        before_sha: to_optional_string(fields.get("before")),
        commit_hashes,
    }
}

fn parse_pages(value: Option<&Value>) -> Vec<WikiPage> {
    let Some(Value::Array(pages)) = value else {
        return Vec::new();
    };
    pages
        .iter()
        .filter_map(Value::as_object)
        .map(|page| WikiPage {
            page_name: to_optional_string(page.get("page_name")),
            title: to_optional_string(page.get("title")),
            action: to_optional_string(page.get("action")),
            sha: to_optional_string(page.get("sha")),
            html_url: to_optional_string(page.get("html_url")),
        })
        .collect()
}

fn object(fields: &Map<String, Value>, key: &str) -> Option<Value> {
    fields.get(key).filter(|v| v.is_object()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn every_known_discriminator_maps_to_its_variant() {
        for kind in EventKind::ALL {
            let payload = dispatch(kind.discriminator(), &Map::new());
            assert_eq!(payload.kind(), Some(kind), "{}", kind.discriminator());
        }
    }

    #[test]
    fn discriminator_table_has_no_duplicates() {
        for (i, a) in EventKind::ALL.iter().enumerate() {
            for b in EventKind::ALL.iter().skip(i + 1) {
                assert_ne!(a.discriminator(), b.discriminator());
            }
        }
    }

    #[test]
    fn unknown_discriminator_keeps_every_field() {
        let raw = fields(json!({
            "action": "created",
            "alert": {"number": 4},
            "nested": [1, 2, {"deep": true}]
        }));
        let payload = dispatch("CodeScanningAlertEvent", &raw);
        match payload {
            Payload::Generic(generic) => {
                assert_eq!(generic.action.as_deref(), Some("created"));
                assert_eq!(generic.extra, raw);
            }
            other => panic!("expected generic payload, got {other:?}"),
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(matches!(dispatch("pushevent", &Map::new()), Payload::Generic(_)));
        assert!(matches!(dispatch("", &Map::new()), Payload::Generic(_)));
    }

    #[test]
    fn push_payload_coerces_counts_and_collects_hashes() {
        let raw = fields(json!({
            "push_id": 1,
            "size": "2",
            "distinct_size": 1,
            "ref": "refs/heads/main",
            "head": "abc",
            "before": "def",
            "commits": [{"sha": "abc", "message": "x"}, {"sha": "0ff"}]
        }));
        let Payload::Push(push) = dispatch("PushEvent", &raw) else {
            panic!("expected push payload");
        };
        assert_eq!(push.commit_count, 2);
        assert_eq!(push.distinct_commit_count, 1);
        assert_eq!(push.git_ref.as_deref(), Some("refs/heads/main"));
        assert_eq!(push.commit_hashes, vec!["abc", "0ff"]);
    }

    #[test]
    fn malformed_push_size_becomes_zero() {
        let raw = fields(json!({"size": "lots", "commits": [{"sha": "a"}]}));
        let Payload::Push(push) = dispatch("PushEvent", &raw) else {
            panic!("expected push payload");
        };
        assert_eq!(push.commit_count, 0);
    }

    #[test]
    fn missing_push_size_counts_commits() {
        let raw = fields(json!({"commits": [{"sha": "a"}, {"sha": "b"}]}));
        let Payload::Push(push) = dispatch("PushEvent", &raw) else {
            panic!("expected push payload");
        };
        assert_eq!(push.commit_count, 2);
        assert_eq!(push.distinct_commit_count, 2);
    }

    #[test]
    fn watch_defaults_to_started() {
        let Payload::Watch(watch) = dispatch("WatchEvent", &Map::new()) else {
            panic!("expected watch payload");
        };
        assert_eq!(watch.action, "started");

        let raw = fields(json!({"action": "stopped"}));
        let Payload::Watch(watch) = dispatch("WatchEvent", &raw) else {
            panic!("expected watch payload");
        };
        assert_eq!(watch.action, "started");
    }

    #[test]
    fn create_reads_master_branch() {
        let raw = fields(json!({
            "ref": null,
            "ref_type": "repository",
            "master_branch": "main",
            "description": "",
            "pusher_type": "user"
        }));
        let Payload::Create(create) = dispatch("CreateEvent", &raw) else {
            panic!("expected create payload");
        };
        assert_eq!(create.git_ref, None);
        assert_eq!(create.default_branch.as_deref(), Some("main"));
        assert_eq!(create.description, None);
    }

    #[test]
    fn pull_request_number_falls_back_to_snapshot() {
        let raw = fields(json!({"action": "opened", "pull_request": {"number": 17}}));
        let Payload::PullRequest(pr) = dispatch("PullRequestEvent", &raw) else {
            panic!("expected pull request payload");
        };
        assert_eq!(pr.number, Some(17));
        assert_eq!(pr.action.as_deref(), Some("opened"));
    }

    #[test]
    fn known_variants_ignore_extra_fields() {
        let raw = fields(json!({"action": "published", "release": {"id": 1}, "junk": 5}));
        let payload = dispatch("ReleaseEvent", &raw);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, json!({"action": "published", "release": {"id": 1}}));
    }

    #[test]
    fn gollum_pages_skip_non_objects() {
        let raw = fields(json!({"pages": [{"page_name": "Home", "action": "edited"}, "bogus"]}));
        let Payload::Gollum(gollum) = dispatch("GollumEvent", &raw) else {
            panic!("expected gollum payload");
        };
        assert_eq!(gollum.pages.len(), 1);
        assert_eq!(gollum.pages[0].page_name.as_deref(), Some("Home"));
    }

    #[test]
    fn generic_serializes_original_fields_once() {
        let raw = fields(json!({"action": "x", "k": 1}));
        let json = serde_json::to_value(dispatch("NewEvent", &raw)).unwrap();
        assert_eq!(json, json!({"action": "x", "k": 1}));
    }
}
