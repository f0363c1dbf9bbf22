//! Media cache layer.
//!
//! [`TtlCache`] memoizes canonical value maps by media id for a configured
//! time span. [`MediaInvalidator`] drops entries when media change.

pub mod invalidation;
pub mod traits;
pub mod ttl;

pub use invalidation::{InvalidationReport, MediaInvalidator};
pub use traits::{CacheStats, CacheableValue};
pub use ttl::{TtlCache, MEDIA_CACHE_NAMESPACE};
