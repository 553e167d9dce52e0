use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NormalizeError, Result};

/// Primary language of a repository. Unrecognised names map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Go,
    Rust,
    Cpp,
    C,
    CSharp,
    Php,
    Ruby,
    Swift,
    Kotlin,
    Dart,
    Html,
    Css,
    Shell,
    Other,
}

impl Language {
    /// Empty or blank input is "no language", not `Other`.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if key.is_empty() {
            return None;
        }
        let language = match key.as_str() {
            "python" => Language::Python,
            "javascript" => Language::JavaScript,
            "typescript" => Language::TypeScript,
            "java" => Language::Java,
            "go" | "golang" => Language::Go,
            "rust" => Language::Rust,
            "cpp" | "c++" => Language::Cpp,
            "c" => Language::C,
            "csharp" | "c#" => Language::CSharp,
            "php" => Language::Php,
            "ruby" => Language::Ruby,
            "swift" => Language::Swift,
            "kotlin" => Language::Kotlin,
            "dart" => Language::Dart,
            "html" => Language::Html,
            "css" => Language::Css,
            "shell" => Language::Shell,
            _ => Language::Other,
        };
        Some(language)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::CSharp => "csharp",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Dart => "dart",
            Language::Html => "html",
            Language::Css => "css",
            Language::Shell => "shell",
            Language::Other => "other",
        }
    }
}

impl From<String> for Language {
    fn from(raw: String) -> Self {
        Language::parse(&raw).unwrap_or(Language::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub username: String,
    #[serde(rename = "type", default = "default_account_type")]
    pub owner_type: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStats {
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub watchers: u64,
    #[serde(default)]
    pub open_issues: u64,
}

impl RepositoryStats {
    pub fn popularity_score(&self) -> f64 {
        self.stars as f64 + self.forks as f64 * 0.8 + self.watchers as f64 * 0.6
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTimestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryLicense {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub spdx_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stats: RepositoryStats,
    pub timestamps: RepositoryTimestamps,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub license: Option<RepositoryLicense>,
    #[serde(default)]
    pub parent_full_name: Option<String>,
}

impl Repository {
    /// Rejects records that break the domain invariants: a name is required
    /// and `full_name` must read `owner/name` whenever the owner is known.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(NormalizeError::conversion("repository name is empty"));
        }
        if !self.owner.username.is_empty() {
            let expected = format!("{}/{}", self.owner.username, self.name);
            if self.full_name != expected {
                return Err(NormalizeError::conversion(format!(
                    "full_name `{}` does not match `{expected}`",
                    self.full_name
                )));
            }
        }
        Ok(())
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t.eq_ignore_ascii_case(topic))
    }

    pub fn is_active(&self, days: i64, now: DateTime<Utc>) -> bool {
        match self.timestamps.pushed_at {
            Some(pushed) => (now - pushed).num_days() <= days,
            None => false,
        }
    }

    pub fn activity_level(&self) -> &'static str {
        let score = self.stats.popularity_score();
        if score >= 1000.0 {
            "Very High"
        } else if score >= 100.0 {
            "High"
        } else if score >= 10.0 {
            "Medium"
        } else if score > 0.0 {
            "Low"
        } else {
            "Inactive"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub public_gists: u64,
}

impl UserStats {
    pub fn influence_score(&self) -> f64 {
        self.followers as f64 + self.public_repos as f64 * 0.5 + self.public_gists as f64 * 0.2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub organizations: Vec<String>,
    pub html_url: String,
    #[serde(default = "default_account_type")]
    pub account_type: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(NormalizeError::conversion("username is empty"));
        }
        if self.html_url.trim().is_empty() {
            return Err(NormalizeError::conversion("html_url is empty"));
        }
        Ok(())
    }

    /// `"Name (login)"` when a display name is known, the login otherwise.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{name} ({})", self.username),
            None => self.username.clone(),
        }
    }

    pub fn has_organization(&self, org: &str) -> bool {
        self.organizations.iter().any(|o| o.eq_ignore_ascii_case(org))
    }

    /// Whole days since the account was created, if that is known.
    pub fn account_age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.created_at.map(|created| (now - created).num_days())
    }

    pub fn is_veteran(&self, years: i64, now: DateTime<Utc>) -> bool {
        self.account_age_days(now)
            .map_or(false, |days| days >= years * 365)
    }

    pub fn activity_level(&self) -> &'static str {
        let score = self.stats.influence_score();
        if score >= 10_000.0 {
            "Very High"
        } else if score >= 1000.0 {
            "High"
        } else if score >= 100.0 {
            "Medium"
        } else if score > 0.0 {
            "Low"
        } else {
            "New User"
        }
    }
}

/// A page of user search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSearchResult {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
}

impl UserSearchResult {
    /// Case-insensitive substring match on `location`.
    pub fn filter_by_location(&self, location: &str) -> Vec<&UserProfile> {
        filter_field(&self.users, location, |user| user.location.as_deref())
    }

    pub fn filter_by_company(&self, company: &str) -> Vec<&UserProfile> {
        filter_field(&self.users, company, |user| user.company.as_deref())
    }

    /// Highest influence first; equal scores keep their order.
    pub fn sort_by_influence(&self) -> Vec<&UserProfile> {
        let mut users: Vec<&UserProfile> = self.users.iter().collect();
        users.sort_by(|a, b| {
            b.stats
                .influence_score()
                .total_cmp(&a.stats.influence_score())
        });
        users
    }
}

fn filter_field<'a>(
    users: &'a [UserProfile],
    needle: &str,
    field: impl Fn(&UserProfile) -> Option<&str>,
) -> Vec<&'a UserProfile> {
    let needle = needle.to_lowercase();
    users
        .iter()
        .filter(|user| field(user).map_or(false, |value| value.to_lowercase().contains(&needle)))
        .collect()
}

fn default_account_type() -> String {
    "User".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn repository() -> Repository {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Repository {
            id: "1".into(),
            name: "hello".into(),
            full_name: "octo/hello".into(),
            description: None,
            url: "https://github.com/octo/hello".into(),
            homepage: None,
            owner: RepositoryOwner {
                username: "octo".into(),
                owner_type: "User".into(),
                avatar_url: None,
            },
            language: Some(Language::Rust),
            topics: vec!["CLI".into()],
            stats: RepositoryStats {
                stars: 90,
                forks: 10,
                watchers: 5,
                open_issues: 1,
            },
            timestamps: RepositoryTimestamps {
                created_at: ts,
                updated_at: ts,
                pushed_at: Some(ts),
            },
            private: false,
            fork: false,
            archived: false,
            default_branch: "main".into(),
            license: None,
            parent_full_name: None,
        }
    }

    #[test]
    fn language_aliases_and_catch_all() {
        assert_eq!(Language::parse("C++"), Some(Language::Cpp));
        assert_eq!(Language::parse("C#"), Some(Language::CSharp));
        assert_eq!(Language::parse("TypeScript"), Some(Language::TypeScript));
        assert_eq!(Language::parse("Jupyter Notebook"), Some(Language::Other));
        assert_eq!(Language::parse("  "), None);
    }

    #[test]
    fn language_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Language::CSharp).unwrap(), json!("csharp"));
        let parsed: Language = serde_json::from_value(json!("Haskell")).unwrap();
        assert_eq!(parsed, Language::Other);
    }

    #[test]
    fn full_name_must_match_owner() {
        let mut repo = repository();
        assert!(repo.validate().is_ok());
        repo.full_name = "someone/else".into();
        assert!(matches!(repo.validate(), Err(NormalizeError::Conversion(_))));
    }

    #[test]
    fn popularity_drives_activity_level() {
        let repo = repository();
        assert_eq!(repo.stats.popularity_score(), 101.0);
        assert_eq!(repo.activity_level(), "High");
        assert!(repo.has_topic("cli"));
    }

    #[test]
    fn activity_window_uses_pushed_at() {
        let repo = repository();
        let pushed = repo.timestamps.pushed_at.unwrap();
        assert!(repo.is_active(30, pushed + Duration::days(10)));
        assert!(!repo.is_active(30, pushed + Duration::days(45)));
    }

    #[test]
    fn user_display_name_and_orgs() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": "1",
            "username": "octo",
            "name": "Octo Cat",
            "html_url": "https://github.com/octo",
            "organizations": ["GitHub"],
            "stats": {"followers": 200}
        }))
        .unwrap();
        assert_eq!(profile.display_name(), "Octo Cat (octo)");
        assert!(profile.has_organization("github"));
        assert_eq!(profile.account_type, "User");
        assert_eq!(profile.activity_level(), "Medium");
    }

    fn user(username: &str, extra: serde_json::Value) -> UserProfile {
        let mut record = json!({
            "id": username,
            "username": username,
            "html_url": format!("https://github.com/{username}")
        });
        if let (Some(base), serde_json::Value::Object(extra)) = (record.as_object_mut(), extra) {
            base.extend(extra);
        }
        serde_json::from_value(record).unwrap()
    }

    #[test]
    fn account_age_and_veteran_status() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let old = user("old", json!({"created_at": "2011-01-25T18:44:36Z"}));
        let fresh = user("fresh", json!({"created_at": "2023-06-01T00:00:00Z"}));
        let unknown = user("unknown", json!({}));

        assert_eq!(fresh.account_age_days(now), Some(214));
        assert!(old.is_veteran(5, now));
        assert!(!fresh.is_veteran(5, now));
        assert_eq!(unknown.account_age_days(now), None);
        assert!(!unknown.is_veteran(0, now));
    }

    #[test]
    fn search_results_filter_and_rank() {
        let results = UserSearchResult {
            users: vec![
                user("a", json!({"location": "Tokyo, Japan", "stats": {"followers": 5}})),
                user("b", json!({"company": "@GitHub", "stats": {"followers": 50}})),
                user("c", json!({"location": "tokyo", "company": "Acme", "stats": {"followers": 20}})),
            ],
            total_count: 3,
            incomplete_results: false,
        };

        let in_tokyo: Vec<&str> = results
            .filter_by_location("TOKYO")
            .iter()
            .map(|u| u.username.as_str())
            .collect();
        assert_eq!(in_tokyo, vec!["a", "c"]);
        assert_eq!(results.filter_by_company("github")[0].username, "b");

        let ranked: Vec<&str> = results
            .sort_by_influence()
            .iter()
            .map(|u| u.username.as_str())
            .collect();
        assert_eq!(ranked, vec!["b", "c", "a"]);
    }
}
