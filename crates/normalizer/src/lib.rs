pub mod coerce;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod models;
pub mod payloads;
pub mod stats;
pub mod transform;

pub use convert::{
    build, normalize_batch, ConversionFailure, Converted, Converter, DomainNormalizer, FromRecord,
    RecordKind,
};
pub use dispatch::{dispatch, EventKind, Payload};
pub use error::{NormalizeError, Result};
pub use event::{assemble, Event, EventActor, EventOrganization, EventRepo};
pub use models::{Language, Repository, UserProfile, UserSearchResult};
pub use payloads::{RepoPayload, UserPayload};
pub use stats::EventStats;
pub use transform::{normalize_repo, normalize_user, parse_repository, parse_user};
