//! Mediacache Storage - Resolution, Caching and Collaborator Traits
//!
//! Resolves published media by id, by parent and at the root. Lookups try the
//! search index first and fall back to the media repository or the legacy
//! media tree; results are normalized into canonical value maps and memoized
//! in a TTL cache that is invalidated by change notifications.

pub mod cache;
pub mod collaborators;
pub mod legacy_xml;
pub mod miss_counter;
pub mod mock;
pub mod normalize;
pub mod published;
pub mod resolver;
pub mod search;

pub use cache::{
    CacheStats, CacheableValue, InvalidationReport, MediaInvalidator, TtlCache,
    MEDIA_CACHE_NAMESPACE,
};
pub use collaborators::{LegacyMediaSource, MediaRepository, UserDirectory};
pub use legacy_xml::{outer_xml, parse_legacy_xml};
pub use miss_counter::{MissCounter, MissRecord};
pub use mock::{MockLegacySource, MockMediaRepository, MockSearchIndex, MockUserDirectory};
pub use normalize::{from_entity, from_legacy_node, from_search_row, MediaSource};
pub use published::PublishedMedia;
pub use resolver::MediaResolver;
pub use search::{
    SearchAccessor, SearchClause, SearchCriteria, SearchIndex, SearchQuery, SortField, SortKind,
};
