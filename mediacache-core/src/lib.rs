//! Mediacache Core - Data Types
//!
//! Pure data structures shared by the media resolution cache: identities,
//! repository entities, search rows, canonical value maps, the legacy media
//! tree, outcomes, errors and configuration. No I/O lives here.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;
pub mod legacy;
pub mod outcome;
pub mod values;

pub use config::{MediaCacheConfig, DEFAULT_INDEX_MISS_THRESHOLD};
pub use entities::{MediaEntity, MediaType, SearchResultRow, UserProperty};
pub use error::{
    ConfigError, MediaCacheError, MediaResult, NormalizeError, SearchError, StorageError,
};
pub use identity::{
    fields, path_segment, MediaId, MediaKey, Timestamp, UserId, DATE_FORMAT, MEDIA_SEARCH_SCOPE,
    RECYCLE_BIN_PATH_PREFIX, ROOT_PARENT_ID,
};
pub use legacy::{LegacyChild, LegacyNode};
pub use outcome::ResolutionOutcome;
pub use values::{CacheValues, CanonicalValueMap, ValueOrigin};
