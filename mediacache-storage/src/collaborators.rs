//! Async traits for the systems the resolver reads from.
//!
//! The search index trait lives in [`crate::search`] next to its query types.

use async_trait::async_trait;
use mediacache_core::{LegacyNode, MediaEntity, MediaId, MediaResult, UserId};

/// System of record for media.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    // ========================================================================
    // MEDIA OPERATIONS
    // ========================================================================

    /// Get media by id, trashed media included.
    async fn get_by_id(&self, id: MediaId) -> MediaResult<Option<MediaEntity>>;

    /// Get the media directly under the root, in sort order.
    async fn get_root_media(&self) -> MediaResult<Vec<MediaEntity>>;
}

/// Resolves user ids to display names for the audit fields.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn display_name(&self, user_id: UserId) -> MediaResult<Option<String>>;
}

/// The legacy media tree, served per media item.
///
/// A lookup for unknown media may answer with a document whose root element
/// is named `error` instead of `None`.
#[async_trait]
pub trait LegacyMediaSource: Send + Sync {
    /// The tree for `id`. With `deep` the tree includes all descendants,
    /// otherwise only the media element and its properties.
    async fn get_media(&self, id: MediaId, deep: bool) -> MediaResult<Option<LegacyNode>>;
}
