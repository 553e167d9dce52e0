use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::coerce::{to_bool, to_timestamp};
use crate::dispatch::{dispatch, Payload};
use crate::error::{NormalizeError, Result};
use crate::payloads::{ActorRef, OrgRef, RepoRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventActor {
    pub id: i64,
    pub login: String,
    pub display_login: Option<String>,
    pub avatar_url: String,
    pub profile_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRepo {
    pub id: i64,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventOrganization {
    pub id: i64,
    pub login: String,
    pub avatar_url: Option<String>,
    pub url: Option<String>,
}

/// A timeline event. Only [`assemble`] constructs one, so the payload variant
/// always matches the `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    actor: EventActor,
    repo: EventRepo,
    payload: Payload,
    public: bool,
    created_at: DateTime<Utc>,
    organization: Option<EventOrganization>,
}

impl Event {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn actor(&self) -> &EventActor {
        &self.actor
    }

    pub fn repo(&self) -> &EventRepo {
        &self.repo
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn organization(&self) -> Option<&EventOrganization> {
        self.organization.as_ref()
    }

    /// One-line description such as `octo pushed 3 commit(s) to octo/hello`.
    pub fn summary(&self) -> String {
        let actor = &self.actor.login;
        let repo = &self.repo.name;
        let action = self.payload.action().unwrap_or("unknown");
        match &self.payload {
            Payload::Push(p) => {
                format!("{actor} pushed {} commit(s) to {repo}", p.commit_count)
            }
            Payload::Watch(_) => format!("{actor} starred {repo}"),
            Payload::Create(p) => {
                let ref_type = p.ref_type.as_deref().unwrap_or("repository");
                match (&p.git_ref, ref_type) {
                    (Some(name), "branch" | "tag") => {
                        format!("{actor} created {ref_type} {name} in {repo}")
                    }
                    _ => format!("{actor} created {ref_type} in {repo}"),
                }
            }
            Payload::Delete(p) => {
                let ref_type = p.ref_type.as_deref().unwrap_or("ref");
                match &p.git_ref {
                    Some(name) => format!("{actor} deleted {ref_type} {name} in {repo}"),
                    None => format!("{actor} deleted {ref_type} in {repo}"),
                }
            }
            Payload::Fork(_) => format!("{actor} forked {repo}"),
            Payload::Issues(_) => format!("{actor} {action} an issue in {repo}"),
            Payload::PullRequest(p) => match p.number {
                Some(number) => format!("{actor} {action} pull request #{number} in {repo}"),
                None => format!("{actor} {action} a pull request in {repo}"),
            },
            Payload::IssueComment(_) => format!("{actor} commented on an issue in {repo}"),
            Payload::CommitComment(_) => format!("{actor} commented on a commit in {repo}"),
            Payload::PullRequestReview(_) => {
                format!("{actor} reviewed a pull request in {repo}")
            }
            Payload::PullRequestReviewComment(_) => {
                format!("{actor} commented on a pull request review in {repo}")
            }
            Payload::Release(_) => format!("{actor} {action} a release in {repo}"),
            Payload::Gollum(p) => {
                format!("{actor} updated {} wiki page(s) in {repo}", p.pages.len())
            }
            Payload::Member(_) => format!("{actor} {action} a collaborator in {repo}"),
            Payload::Public(_) => format!("{actor} made {repo} public"),
            Payload::Sponsorship(_) => format!("{actor} {action} a sponsorship"),
            Payload::Generic(_) => format!("{actor} performed {} in {repo}", self.event_type),
        }
    }
}

/// Builds an [`Event`] from an API-shaped record.
///
/// `id`, `type`, `actor`, `repo`, `created_at` and `public` have no safe
/// default; a record missing any of them is rejected with
/// [`NormalizeError::MalformedRecord`]. The payload goes through [`dispatch`]
/// keyed by `type`, so unknown types still assemble.
pub fn assemble(record: &Value) -> Result<Event> {
    let obj = record
        .as_object()
        .ok_or(NormalizeError::NotAnObject("event record"))?;

    let id = match required(obj, "id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(NormalizeError::invalid("id", format!("unexpected {other}"))),
    };
    let event_type = required(obj, "type")?
        .as_str()
        .ok_or_else(|| NormalizeError::invalid("type", "expected a string"))?
        .to_string();

    let actor: ActorRef = serde_json::from_value(required(obj, "actor")?.clone())
        .map_err(|err| NormalizeError::invalid("actor", err.to_string()))?;
    let repo: RepoRef = serde_json::from_value(required(obj, "repo")?.clone())
        .map_err(|err| NormalizeError::invalid("repo", err.to_string()))?;
    let created_at = to_timestamp(Some(required(obj, "created_at")?));
    let public = to_bool(Some(required(obj, "public")?), false);

    let empty = Map::new();
    let fields = obj
        .get("payload")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let payload = dispatch(&event_type, fields);

    let organization = obj
        .get("org")
        .or_else(|| obj.get("organization"))
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value::<OrgRef>(v.clone()).ok())
        .map(|org| EventOrganization {
            id: org.id,
            login: org.login,
            avatar_url: org.avatar_url,
            url: org.url,
        });

    Ok(Event {
        id,
        event_type,
        actor: EventActor {
            id: actor.id,
            login: actor.login,
            display_login: actor.display_login,
            avatar_url: actor.avatar_url,
            profile_url: actor.url,
        },
        repo: EventRepo {
            id: repo.id,
            name: repo.name,
            url: repo.url,
        },
        payload,
        public,
        created_at,
        organization,
    })
}

fn required<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(NormalizeError::MalformedRecord(field)),
        Some(value) => Ok(value),
    }
}
