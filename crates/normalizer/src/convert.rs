//! Converters from extraction-origin records to the canonical domain shape.
//!
//! Extraction records come from an unreliable source (HTML scraped and read
//! by an LLM): counts arrive as `"1,024"`, booleans as `"true"`, and field
//! names differ from the REST API. Each converter maps such a record onto a
//! JSON object shaped exactly like the domain type's serialized form.
//! Turning that object into a domain value is a separate step ([`build`]),
//! so converters never deal with constructor failures themselves.

use chrono::{DateTime, SecondsFormat, Utc};
use common::config::NormalizerConfig;
use common::text::{content_id, pascal_case};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::coerce::{
    to_bool, to_count, to_optional_string, to_optional_timestamp, to_string_or, to_string_set,
    to_timestamp,
};
use crate::error::{NormalizeError, Result};
use crate::event::{assemble, Event};
use crate::models::{Language, Repository, UserProfile};

/// Which converter applies to an extraction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Repository,
    UserProfile,
    Event,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Repository => "repository",
            RecordKind::UserProfile => "user_profile",
            RecordKind::Event => "event",
        }
    }
}

/// Domain values that can be constructed from a canonical record.
pub trait FromRecord: Sized {
    fn from_record(record: &Map<String, Value>) -> Result<Self>;
}

impl FromRecord for Repository {
    fn from_record(record: &Map<String, Value>) -> Result<Self> {
        let repo: Repository = serde_json::from_value(Value::Object(record.clone()))
            .map_err(|err| NormalizeError::conversion(err.to_string()))?;
        repo.validate()?;
        Ok(repo)
    }
}

impl FromRecord for UserProfile {
    fn from_record(record: &Map<String, Value>) -> Result<Self> {
        let profile: UserProfile = serde_json::from_value(Value::Object(record.clone()))
            .map_err(|err| NormalizeError::conversion(err.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }
}

impl FromRecord for Event {
    fn from_record(record: &Map<String, Value>) -> Result<Self> {
        assemble(&Value::Object(record.clone()))
    }
}

pub fn build<T: FromRecord>(record: &Map<String, Value>) -> Result<T> {
    T::from_record(record)
}

pub trait Converter {
    type Output: FromRecord;

    fn kind(&self) -> RecordKind;

    fn convert(&self, raw: &Map<String, Value>) -> Result<Map<String, Value>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionFailure {
    pub index: usize,
    pub reason: String,
}

/// Outcome of converting a batch: everything that survived, in input order,
/// plus one entry per dropped record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Converted<T> {
    pub items: Vec<T>,
    pub failures: Vec<ConversionFailure>,
}

impl<T> Default for Converted<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Converted<T> {
    fn push_failure(&mut self, kind: RecordKind, index: usize, err: &NormalizeError) {
        warn!(
            kind = kind.as_str(),
            index,
            error = %err,
            "dropping record that failed conversion"
        );
        self.failures.push(ConversionFailure {
            index,
            reason: err.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct RepositoryConverter {
    config: NormalizerConfig,
}

impl RepositoryConverter {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }
}

impl Converter for RepositoryConverter {
    type Output = Repository;

    fn kind(&self) -> RecordKind {
        RecordKind::Repository
    }

    fn convert(&self, raw: &Map<String, Value>) -> Result<Map<String, Value>> {
        let given_full_name = to_optional_string(raw.get("full_name"));
        let (full_name_owner, full_name_repo) = match given_full_name.as_deref() {
            Some(full) => match full.split_once('/') {
                Some((owner, name)) => (Some(owner.to_string()), Some(name.to_string())),
                None => (None, Some(full.to_string())),
            },
            None => (None, None),
        };

        let (name_owner, name) = match to_optional_string(raw.get("name")) {
            Some(name) => match name.rsplit_once('/') {
                Some((owner, last)) if !owner.is_empty() => {
                    (Some(owner.to_string()), Some(last.to_string()))
                }
                Some((_, last)) => (None, Some(last.to_string())),
                None => (None, Some(name)),
            },
            None => (None, None),
        };
        let name = name
            .or(full_name_repo)
            .ok_or_else(|| NormalizeError::conversion("repository name is missing"))?;

        let owner_username = to_optional_string(pick(
            raw,
            &["owner_username", "owner.username", "owner.login"],
        ))
        .or(full_name_owner)
        .or(name_owner);

        let full_name = match &owner_username {
            Some(owner) => format!("{owner}/{name}"),
            None => given_full_name.unwrap_or_else(|| name.clone()),
        };

        let id = to_optional_string(raw.get("id"))
            .unwrap_or_else(|| content_id(&[name.as_str()]).to_string());
        let url = to_optional_string(pick(raw, &["url", "html_url"]))
            .unwrap_or_else(|| self.config.profile_url(&full_name));
        let language = to_optional_string(raw.get("language"))
            .and_then(|lang| Language::parse(&lang))
            .map(|lang| lang.as_str());

        let created_at = to_timestamp(pick(raw, &["created_at", "timestamps.created_at"]));
        let updated_at = to_timestamp(pick(raw, &["updated_at", "timestamps.updated_at"]));
        let pushed_at =
            to_optional_timestamp(pick(raw, &["pushed_at", "timestamps.pushed_at"]));

        let record = json!({
            "id": id,
            "name": name,
            "full_name": full_name,
            "description": to_optional_string(raw.get("description")),
            "url": url,
            "homepage": to_optional_string(raw.get("homepage")),
            "owner": {
                "username": owner_username.unwrap_or_default(),
                "type": to_string_or(pick(raw, &["owner_type", "owner.type"]), "User"),
                "avatar_url": to_optional_string(pick(raw, &["owner_avatar", "owner.avatar_url"])),
            },
            "language": language,
            "topics": to_string_set(raw.get("topics")),
            "stats": {
                "stars": to_count(pick(raw, &["stars", "stargazers_count", "stats.stars"])),
                "forks": to_count(pick(raw, &["forks", "forks_count", "stats.forks"])),
                "watchers": to_count(pick(raw, &["watchers", "watchers_count", "stats.watchers"])),
                "open_issues": to_count(pick(raw, &["open_issues", "open_issues_count", "stats.open_issues"])),
            },
            "timestamps": {
                "created_at": timestamp_value(created_at),
                "updated_at": timestamp_value(updated_at),
                "pushed_at": pushed_at.map(timestamp_value),
            },
            "private": to_bool(raw.get("private"), false),
            "fork": to_bool(raw.get("fork"), false),
            "archived": to_bool(raw.get("archived"), false),
            "default_branch": to_string_or(raw.get("default_branch"), "main"),
            "license": license(raw.get("license")),
            "parent_full_name": to_optional_string(raw.get("parent_full_name")),
        });
        into_object(record)
    }
}

#[derive(Debug, Clone)]
pub struct UserProfileConverter {
    config: NormalizerConfig,
}

impl UserProfileConverter {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }
}

impl Converter for UserProfileConverter {
    type Output = UserProfile;

    fn kind(&self) -> RecordKind {
        RecordKind::UserProfile
    }

    fn convert(&self, raw: &Map<String, Value>) -> Result<Map<String, Value>> {
        let username = to_optional_string(pick(raw, &["username", "login", "name"]))
            .unwrap_or_else(|| "unknown".to_string());
        let id = to_optional_string(raw.get("id")).unwrap_or_else(|| username.clone());
        let html_url = to_optional_string(pick(raw, &["html_url", "profile_url"]))
            .unwrap_or_else(|| self.config.profile_url(&username));

        let record = json!({
            "id": id,
            "username": username,
            "name": to_optional_string(pick(raw, &["display_name", "name"])),
            "bio": to_optional_string(raw.get("bio")),
            "avatar_url": to_optional_string(raw.get("avatar_url")),
            "location": to_optional_string(raw.get("location")),
            "company": to_optional_string(raw.get("company")),
            "social_links": {
                "website": to_optional_string(pick(raw, &["website", "blog", "social_links.website"])),
                "twitter": to_optional_string(pick(raw, &["twitter", "twitter_username", "social_links.twitter"])),
                "email": to_optional_string(pick(raw, &["email", "social_links.email"])),
            },
            "stats": {
                "followers": to_count(pick(raw, &["followers", "stats.followers"])),
                "following": to_count(pick(raw, &["following", "stats.following"])),
                "public_repos": to_count(pick(raw, &["public_repos", "stats.public_repos"])),
                "public_gists": to_count(pick(raw, &["public_gists", "stats.public_gists"])),
            },
            "organizations": organizations(raw.get("organizations")),
            "html_url": html_url,
            "account_type": to_string_or(pick(raw, &["account_type", "type"]), "User"),
            "created_at": to_optional_timestamp(raw.get("created_at")).map(timestamp_value),
        });
        into_object(record)
    }
}

/// Converts the flat activity vocabulary (`actor_username`,
/// `repository_name`, `action_description`, `commit_count`, ...) into an
/// API-shaped event record that [`assemble`] accepts.
#[derive(Debug, Clone)]
pub struct EventConverter {
    config: NormalizerConfig,
}

impl EventConverter {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }
}

impl Converter for EventConverter {
    type Output = Event;

    fn kind(&self) -> RecordKind {
        RecordKind::Event
    }

    fn convert(&self, raw: &Map<String, Value>) -> Result<Map<String, Value>> {
        let discriminator = activity_discriminator(&to_string_or(
            pick(raw, &["type", "activity_type"]),
            "",
        ));
        let timestamp_raw = pick(raw, &["timestamp", "created_at", "date"]);
        let timestamp = to_optional_string(timestamp_raw);
        let actor = to_optional_string(pick(raw, &["actor_username", "actor.login"]))
            .ok_or_else(|| NormalizeError::conversion("actor_username is missing"))?;
        let repo_name =
            to_optional_string(pick(raw, &["repository_name", "repo.name"]))
                .unwrap_or_default();

        // Derived from (type, timestamp): two activities of the same type at
        // the same instant share an id.
        let id = to_optional_string(raw.get("id")).unwrap_or_else(|| {
            content_id(&[discriminator.as_str(), timestamp.as_deref().unwrap_or("")]).to_string()
        });
        let repo_url = to_optional_string(raw.get("repository_url")).unwrap_or_else(|| {
            if repo_name.is_empty() {
                String::new()
            } else {
                self.config.profile_url(&repo_name)
            }
        });

        let mut payload = Map::new();
        let optional_fields = [
            ("action", pick(raw, &["action", "action_description"])),
            ("description", pick(raw, &["action_description", "description"])),
            ("ref", pick(raw, &["branch_name", "branch", "ref"])),
            ("repository_description", pick(raw, &["repository_description"])),
        ];
        for (key, value) in optional_fields {
            if let Some(text) = to_optional_string(value) {
                payload.insert(key.to_string(), Value::String(text));
            }
        }
        if let Some(count) = pick(raw, &["commit_count", "size"]) {
            payload.insert("size".to_string(), json!(to_count(Some(count))));
        }

        let record = json!({
            "id": id,
            "type": discriminator,
            "actor": {
                "id": content_id(&[actor.as_str()]),
                "login": actor,
                "avatar_url": to_string_or(pick(raw, &["actor_avatar", "actor.avatar_url"]), ""),
                "url": self.config.profile_url(&actor),
            },
            "repo": {
                "id": content_id(&[repo_name.as_str()]),
                "name": repo_name,
                "url": repo_url,
            },
            "payload": payload,
            "public": to_bool(raw.get("public"), true),
            "created_at": timestamp_value(to_timestamp(timestamp_raw)),
        });
        into_object(record)
    }
}

/// Entry point for extraction-origin records of every kind.
#[derive(Debug, Clone)]
pub struct DomainNormalizer {
    repositories: RepositoryConverter,
    profiles: UserProfileConverter,
    events: EventConverter,
}

impl DomainNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            repositories: RepositoryConverter::new(config.clone()),
            profiles: UserProfileConverter::new(config.clone()),
            events: EventConverter::new(config),
        }
    }

    pub fn convert(&self, kind: RecordKind, raw: &Value) -> Result<Map<String, Value>> {
        let obj = raw
            .as_object()
            .ok_or(NormalizeError::NotAnObject("extraction record"))?;
        match kind {
            RecordKind::Repository => self.repositories.convert(obj),
            RecordKind::UserProfile => self.profiles.convert(obj),
            RecordKind::Event => self.events.convert(obj),
        }
    }

    /// Converts each record independently. A record that fails is dropped
    /// and reported; it never aborts the rest of the batch.
    pub fn convert_batch(&self, kind: RecordKind, records: &[Value]) -> Converted<Map<String, Value>> {
        let mut out = Converted::default();
        for (index, raw) in records.iter().enumerate() {
            match self.convert(kind, raw) {
                Ok(record) => out.items.push(record),
                Err(err) => out.push_failure(kind, index, &err),
            }
        }
        out
    }

    pub fn repositories(&self, records: &[Value]) -> Converted<Repository> {
        normalize_batch(&self.repositories, records)
    }

    pub fn user_profiles(&self, records: &[Value]) -> Converted<UserProfile> {
        normalize_batch(&self.profiles, records)
    }

    pub fn events(&self, records: &[Value]) -> Converted<Event> {
        normalize_batch(&self.events, records)
    }
}

/// Converts and constructs each record; conversion or construction failures
/// drop only the offending record.
pub fn normalize_batch<C: Converter>(converter: &C, records: &[Value]) -> Converted<C::Output> {
    let mut out = Converted::default();
    for (index, raw) in records.iter().enumerate() {
        let result = raw
            .as_object()
            .ok_or(NormalizeError::NotAnObject("extraction record"))
            .and_then(|obj| converter.convert(obj))
            .and_then(|record| build::<C::Output>(&record));
        match result {
            Ok(item) => out.items.push(item),
            Err(err) => out.push_failure(converter.kind(), index, &err),
        }
    }
    out
}

/// Maps extraction activity types (`push`, `star`, `pull_request`, ...) to
/// API discriminators. Values already shaped like `SomethingEvent` pass
/// through; anything unrecognised becomes `PascalCaseEvent`.
pub fn activity_discriminator(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.ends_with("Event") && trimmed.starts_with(|c: char| c.is_ascii_uppercase()) {
        return trimmed.to_string();
    }
    let key = trimmed.to_lowercase().replace(['-', ' '], "_");
    let known = match key.as_str() {
        "push" | "commit" => "PushEvent",
        "pull_request" | "pr" => "PullRequestEvent",
        "issue" | "issues" => "IssuesEvent",
        "issue_comment" => "IssueCommentEvent",
        "commit_comment" => "CommitCommentEvent",
        "pull_request_review" | "review" => "PullRequestReviewEvent",
        "pull_request_review_comment" | "review_comment" => "PullRequestReviewCommentEvent",
        "create" | "create_repo" | "create_branch" | "create_tag" => "CreateEvent",
        "delete" => "DeleteEvent",
        "star" | "watch" => "WatchEvent",
        "fork" => "ForkEvent",
        "release" => "ReleaseEvent",
        "member" => "MemberEvent",
        "public" => "PublicEvent",
        "gollum" | "wiki" => "GollumEvent",
        "sponsorship" | "sponsor" => "SponsorshipEvent",
        "" => "UnknownEvent",
        _ => return format!("{}Event", pascal_case(trimmed)),
    };
    known.to_string()
}

/// First value among `keys` that is neither null nor a blank string. A key
/// containing `.` walks nested objects (`stats.stars`).
fn pick<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| lookup(raw, key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

fn lookup<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let mut current = raw.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn license(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Object(obj)) => {
            let key = to_optional_string(obj.get("key"));
            let name = to_optional_string(obj.get("name"));
            match (key, name) {
                (Some(key), Some(name)) => json!({
                    "key": key,
                    "name": name,
                    "spdx_id": to_optional_string(obj.get("spdx_id")),
                }),
                _ => Value::Null,
            }
        }
        Some(other) => match to_optional_string(Some(other)) {
            Some(name) => json!({"key": name.to_lowercase(), "name": name, "spdx_id": null}),
            None => Value::Null,
        },
        None => Value::Null,
    }
}

fn organizations(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let logins: Vec<Value> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(obj) => pick(obj, &["login", "name"]).cloned(),
                    other => Some(other.clone()),
                })
                .collect();
            to_string_set(Some(&Value::Array(logins)))
        }
        other => to_string_set(other),
    }
}

fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(NormalizeError::NotAnObject("normalized record")),
    }
}
