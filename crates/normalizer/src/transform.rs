use common::config::NormalizerConfig;
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    Language, Repository, RepositoryLicense, RepositoryOwner, RepositoryStats,
    RepositoryTimestamps, SocialLinks, UserProfile, UserStats,
};
use crate::payloads::{RepoPayload, UserPayload};

/// Builds a repository from a REST record. Forks that carry their `parent`
/// borrow its stats, and its topics and description when their own are empty.
pub fn normalize_repo(payload: &RepoPayload) -> Repository {
    let mut description = non_empty(payload.description.as_deref());
    let mut topics = payload.topics.clone();
    let mut stats = RepositoryStats {
        stars: payload.stargazers_count,
        forks: payload.forks_count,
        watchers: payload.watchers_count,
        open_issues: payload.open_issues_count,
    };
    let mut parent_full_name = None;

    if let (true, Some(parent)) = (payload.fork, payload.parent.as_ref()) {
        parent_full_name = Some(parent.full_name.clone());
        if topics.is_empty() {
            topics = parent.topics.clone();
        }
        if description.is_none() {
            description = non_empty(parent.description.as_deref());
        }
        stats = RepositoryStats {
            stars: parent.stargazers_count,
            forks: parent.forks_count,
            watchers: parent.watchers_count,
            open_issues: parent.open_issues_count,
        };
    }

    Repository {
        id: payload.id.to_string(),
        name: payload.name.clone(),
        full_name: payload.full_name.clone(),
        description,
        url: payload.html_url.clone(),
        homepage: non_empty(payload.homepage.as_deref()),
        owner: RepositoryOwner {
            username: payload.owner.login.clone(),
            owner_type: payload
                .owner
                .owner_type
                .clone()
                .unwrap_or_else(|| "User".to_string()),
            avatar_url: non_empty(payload.owner.avatar_url.as_deref()),
        },
        language: payload.language.as_deref().and_then(Language::parse),
        topics: dedupe(topics),
        stats,
        timestamps: RepositoryTimestamps {
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            pushed_at: payload.pushed_at,
        },
        private: payload.private,
        fork: payload.fork,
        archived: payload.archived,
        default_branch: payload
            .default_branch
            .clone()
            .unwrap_or_else(|| "main".to_string()),
        license: payload.license.as_ref().map(|license| RepositoryLicense {
            key: license.key.clone(),
            name: license.name.clone(),
            spdx_id: license.spdx_id.clone(),
        }),
        parent_full_name,
    }
}

pub fn normalize_user(payload: &UserPayload, config: &NormalizerConfig) -> UserProfile {
    UserProfile {
        id: payload.id.to_string(),
        username: payload.login.clone(),
        name: non_empty(payload.name.as_deref()),
        bio: non_empty(payload.bio.as_deref()),
        avatar_url: non_empty(payload.avatar_url.as_deref()),
        location: non_empty(payload.location.as_deref()),
        company: non_empty(payload.company.as_deref()),
        social_links: SocialLinks {
            website: non_empty(payload.blog.as_deref()),
            twitter: non_empty(payload.twitter_username.as_deref()),
            email: non_empty(payload.email.as_deref()),
        },
        stats: UserStats {
            followers: payload.followers,
            following: payload.following,
            public_repos: payload.public_repos,
            public_gists: payload.public_gists,
        },
        organizations: Vec::new(),
        html_url: non_empty(payload.html_url.as_deref())
            .unwrap_or_else(|| config.profile_url(&payload.login)),
        account_type: payload
            .user_type
            .clone()
            .unwrap_or_else(|| "User".to_string()),
        created_at: payload.created_at,
    }
}

pub fn parse_repository(raw: &Value) -> Result<Repository> {
    let payload: RepoPayload = serde_json::from_value(raw.clone())?;
    Ok(normalize_repo(&payload))
}

pub fn parse_user(raw: &Value, config: &NormalizerConfig) -> Result<UserProfile> {
    let payload: UserPayload = serde_json::from_value(raw.clone())?;
    Ok(normalize_user(&payload, config))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
