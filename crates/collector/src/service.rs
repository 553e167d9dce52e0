use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use common::config::{CollectorConfig, NormalizerConfig};
use normalizer::{
    assemble, parse_repository, parse_user, ConversionFailure, Converted, DomainNormalizer, Event,
    EventStats, RecordKind, Repository, UserProfile,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::batch::{BatchExecutor, ItemFailure};
use crate::client::GithubClient;
use crate::metrics;

/// A fetch that failed for one key of a collection pass.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionFailure {
    pub operation: &'static str,
    pub target: String,
    pub reason: String,
}

impl CollectionFailure {
    fn new(operation: &'static str, target: &str, err: &ItemFailure) -> Self {
        Self {
            operation,
            target: target.to_string(),
            reason: format!("{err:#}"),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CollectionReport {
    /// Events per source, keyed `user:<login>`, `repo:<owner/name>`,
    /// `org:<login>` or `public`.
    pub events: BTreeMap<String, Vec<Event>>,
    pub repositories: Vec<Repository>,
    pub profiles: Vec<UserProfile>,
    /// Computed over events with distinct ids across all sources.
    pub stats: EventStats,
    pub dropped_records: usize,
    pub failures: Vec<CollectionFailure>,
}

type EventPages = HashMap<String, Result<Converted<Event>, ItemFailure>>;

pub struct Collector<C: GithubClient + 'static> {
    config: CollectorConfig,
    normalizer_config: NormalizerConfig,
    client: Arc<C>,
    executor: BatchExecutor,
    normalizer: DomainNormalizer,
}

impl<C: GithubClient + 'static> Collector<C> {
    pub fn new(
        config: CollectorConfig,
        normalizer_config: NormalizerConfig,
        client: Arc<C>,
    ) -> Self {
        let executor = BatchExecutor::new(config.concurrency_limit);
        let normalizer = DomainNormalizer::new(normalizer_config.clone());
        Self {
            config,
            normalizer_config,
            client,
            executor,
            normalizer,
        }
    }

    pub async fn fetch_public_events(&self) -> Result<Converted<Event>> {
        let raw = self.client.list_public_events(self.config.per_page).await?;
        Ok(assemble_page(&raw))
    }

    pub async fn fetch_user_events(&self, usernames: &[String]) -> EventPages {
        let scope = self.config.event_scope;
        let per_page = self.config.per_page;
        self.collect_events(usernames, move |client, username| async move {
            client.list_user_events(&username, scope, per_page).await
        })
        .await
    }

    /// Keys are `owner/name`.
    pub async fn fetch_repository_events(&self, full_names: &[String]) -> EventPages {
        let per_page = self.config.per_page;
        self.collect_events(full_names, move |client, full_name| async move {
            let (owner, name) = split_full_name(&full_name)?;
            client.list_repo_events(owner, name, per_page).await
        })
        .await
    }

    pub async fn fetch_org_events(&self, orgs: &[String]) -> EventPages {
        let per_page = self.config.per_page;
        self.collect_events(orgs, move |client, org| async move {
            client.list_org_events(&org, per_page).await
        })
        .await
    }

    /// One result per input, in input order.
    pub async fn fetch_repositories(
        &self,
        full_names: &[String],
    ) -> Vec<Result<Repository, ItemFailure>> {
        let client = &self.client;
        self.executor
            .run(full_names.to_vec(), |full_name| {
                let client = Arc::clone(client);
                async move {
                    let (owner, name) = split_full_name(&full_name)?;
                    let raw = client.get_repo(owner, name).await?;
                    Ok::<_, anyhow::Error>(parse_repository(&raw)?)
                }
            })
            .await
    }

    /// Records that fail to parse are skipped, like malformed events.
    pub async fn fetch_user_repositories(&self, username: &str) -> Result<Vec<Repository>> {
        let raw = self
            .client
            .list_user_repos(username, self.config.per_page)
            .await?;
        let mut repos = Vec::with_capacity(raw.len());
        for (index, record) in raw.iter().enumerate() {
            match parse_repository(record) {
                Ok(repo) => repos.push(repo),
                Err(err) => {
                    metrics::RECORDS_DROPPED_TOTAL
                        .with_label_values(&["api_repository"])
                        .inc();
                    warn!(
                        username,
                        index,
                        error = %err,
                        "dropping unparsable repository record"
                    );
                }
            }
        }
        Ok(repos)
    }

    pub async fn fetch_profiles(
        &self,
        usernames: &[String],
    ) -> HashMap<String, Result<UserProfile, ItemFailure>> {
        let client = &self.client;
        let config = &self.normalizer_config;
        self.executor
            .run_keyed(usernames.to_vec(), |username| {
                let client = Arc::clone(client);
                let config = config.clone();
                async move {
                    let raw = client.get_user(&username).await?;
                    Ok::<_, anyhow::Error>(parse_user(&raw, &config)?)
                }
            })
            .await
    }

    /// Converts extraction-origin records; failures are reported per index
    /// and never abort the batch.
    pub fn normalize_extracted(
        &self,
        kind: RecordKind,
        records: &[Value],
    ) -> Converted<Map<String, Value>> {
        let converted = self.normalizer.convert_batch(kind, records);
        if !converted.failures.is_empty() {
            metrics::RECORDS_DROPPED_TOTAL
                .with_label_values(&[kind.as_str()])
                .inc_by(converted.failures.len() as u64);
        }
        converted
    }

    pub fn normalizer(&self) -> &DomainNormalizer {
        &self.normalizer
    }

    /// Runs every configured source once. With nothing configured the public
    /// timeline is read instead.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> CollectionReport {
        metrics::RUNS_TOTAL.inc();
        let mut report = CollectionReport::default();
        let usernames = &self.config.usernames;
        let repositories = &self.config.repositories;
        let orgs = &self.config.organizations;

        if usernames.is_empty() && repositories.is_empty() && orgs.is_empty() {
            match self.fetch_public_events().await {
                Ok(page) => report.record_events("public".to_string(), page),
                Err(err) => report.failures.push(CollectionFailure {
                    operation: "public_events",
                    target: "public".to_string(),
                    reason: format!("{err:#}"),
                }),
            }
        }

        let mut pages = self.fetch_user_events(usernames).await;
        report.record_pages("user_events", "user", usernames, &mut pages);

        let mut pages = self.fetch_repository_events(repositories).await;
        report.record_pages("repo_events", "repo", repositories, &mut pages);

        let mut pages = self.fetch_org_events(orgs).await;
        report.record_pages("org_events", "org", orgs, &mut pages);

        let repos = self.fetch_repositories(repositories).await;
        for (full_name, result) in repositories.iter().zip(repos) {
            match result {
                Ok(repo) => report.repositories.push(repo),
                Err(err) => report
                    .failures
                    .push(CollectionFailure::new("repository", full_name, &err)),
            }
        }

        let mut profiles = self.fetch_profiles(usernames).await;
        for username in usernames {
            match profiles.remove(username) {
                Some(Ok(profile)) => report.profiles.push(profile),
                Some(Err(err)) => report
                    .failures
                    .push(CollectionFailure::new("profile", username, &err)),
                None => {}
            }
        }

        let mut seen = HashSet::new();
        report.stats = EventStats::from_events(
            report
                .events
                .values()
                .flatten()
                .filter(|event| seen.insert(event.id().to_string())),
        );

        info!(
            events = report.stats.total_events,
            repositories = report.repositories.len(),
            profiles = report.profiles.len(),
            dropped = report.dropped_records,
            failures = report.failures.len(),
            "collection pass finished"
        );
        report
    }

    async fn collect_events<F, Fut>(&self, keys: &[String], fetch: F) -> EventPages
    where
        F: Fn(Arc<C>, String) -> Fut,
        Fut: Future<Output = Result<Vec<Value>>>,
    {
        let client = &self.client;
        let fetch = &fetch;
        self.executor
            .run_keyed(keys.to_vec(), |key| {
                let page = fetch(Arc::clone(client), key);
                async move { Ok::<_, anyhow::Error>(assemble_page(&page.await?)) }
            })
            .await
    }
}

impl CollectionReport {
    fn record_events(&mut self, key: String, page: Converted<Event>) {
        self.dropped_records += page.failures.len();
        self.events.entry(key).or_default().extend(page.items);
    }

    fn record_pages(
        &mut self,
        operation: &'static str,
        prefix: &str,
        keys: &[String],
        pages: &mut EventPages,
    ) {
        for key in keys {
            match pages.remove(key) {
                Some(Ok(page)) => self.record_events(format!("{prefix}:{key}"), page),
                Some(Err(err)) => self
                    .failures
                    .push(CollectionFailure::new(operation, key, &err)),
                None => {}
            }
        }
    }
}

/// Assembles one page of API event records. Malformed records are dropped
/// and reported by index; the rest of the page is kept.
pub fn assemble_page(records: &[Value]) -> Converted<Event> {
    let mut page = Converted::default();
    for (index, record) in records.iter().enumerate() {
        match assemble(record) {
            Ok(event) => {
                metrics::EVENTS_ASSEMBLED_TOTAL.inc();
                page.items.push(event);
            }
            Err(err) => {
                metrics::RECORDS_DROPPED_TOTAL
                    .with_label_values(&["api_event"])
                    .inc();
                warn!(index, error = %err, "dropping malformed event record");
                page.failures.push(ConversionFailure {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }
    page
}

fn split_full_name(full_name: &str) -> Result<(&str, &str)> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(anyhow!("repository `{full_name}` is not in owner/name form")),
    }
}
