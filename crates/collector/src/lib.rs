pub mod batch;
pub mod client;
pub mod metrics;
pub mod service;

pub use batch::{BatchExecutor, ItemFailure};
pub use client::{GithubApiError, GithubClient, RestGithubClient};
pub use service::{CollectionFailure, CollectionReport, Collector};
