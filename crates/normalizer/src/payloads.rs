//! Record shapes as returned by the GitHub REST API. These are trusted and
//! deserialized directly; see `convert` for the untrusted extraction path.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RepoPayload {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub homepage: Option<String>,
    pub owner: OwnerRef,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub default_branch: Option<String>,
    pub license: Option<LicenseRef>,
    pub parent: Option<ParentRepoRef>,
}

/// The subset of a fork's `parent` used to enrich the fork.
#[derive(Debug, Clone, Deserialize)]
pub struct ParentRepoRef {
    pub full_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerRef {
    pub login: String,
    #[serde(rename = "type")]
    pub owner_type: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseRef {
    pub key: String,
    pub name: String,
    pub spdx_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub twitter_username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub public_gists: u64,
    pub html_url: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// `actor` of an event record.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorRef {
    pub id: i64,
    pub login: String,
    pub display_login: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub url: String,
}

/// `repo` of an event record.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// `org` of an event record.
#[derive(Debug, Clone, Deserialize)]
pub struct OrgRef {
    pub id: i64,
    pub login: String,
    pub avatar_url: Option<String>,
    pub url: Option<String>,
}
