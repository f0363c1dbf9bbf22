//! Media resolution engine.
//!
//! Lookups go to the search index first and fall back to the media
//! repository, or for children to the legacy media tree. Every resolved item
//! passes through the TTL cache, keyed by media id.

use std::fmt;
use std::sync::Arc;

use mediacache_core::{
    fields, CacheValues, LegacyNode, MediaCacheConfig, MediaCacheError, MediaId, MediaKey,
    MediaResult, NormalizeError, ResolutionOutcome, ROOT_PARENT_ID, MEDIA_SEARCH_SCOPE,
};

use crate::cache::{CacheStats, InvalidationReport, MediaInvalidator, TtlCache};
use crate::collaborators::{LegacyMediaSource, MediaRepository, UserDirectory};
use crate::miss_counter::MissCounter;
use crate::normalize::MediaSource;
use crate::published::PublishedMedia;
use crate::search::{SearchAccessor, SearchCriteria};

fn unsupported<T>(operation: &'static str) -> MediaResult<T> {
    Err(MediaCacheError::Unsupported { operation })
}

/// Resolves media by id, by parent and at the root.
pub struct MediaResolver {
    search: SearchAccessor,
    repository: Arc<dyn MediaRepository>,
    users: Arc<dyn UserDirectory>,
    legacy: Option<Arc<dyn LegacyMediaSource>>,
    cache: Arc<TtlCache<CacheValues>>,
    invalidator: MediaInvalidator<CacheValues>,
    misses: MissCounter,
    config: MediaCacheConfig,
}

impl fmt::Debug for MediaResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaResolver")
            .field("search", &self.search)
            .field("legacy", &self.legacy.is_some())
            .field("cache_entries", &self.cache.len())
            .field("misses", &self.misses)
            .field("config", &self.config)
            .finish()
    }
}

impl MediaResolver {
    /// Create a resolver with its own cache.
    pub fn new(
        config: MediaCacheConfig,
        search: SearchAccessor,
        repository: Arc<dyn MediaRepository>,
        users: Arc<dyn UserDirectory>,
    ) -> MediaResult<Self> {
        config.validate()?;
        let cache = Arc::new(TtlCache::from_config(&config));
        Ok(Self {
            search,
            repository,
            users,
            legacy: None,
            invalidator: MediaInvalidator::new(Arc::clone(&cache)),
            cache,
            misses: MissCounter::new(config.index_miss_threshold),
            config,
        })
    }

    /// Use a legacy media source for lookups the search index cannot serve.
    pub fn with_legacy_source(mut self, source: Arc<dyn LegacyMediaSource>) -> Self {
        self.legacy = Some(source);
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &MediaCacheConfig {
        &self.config
    }

    /// The cache shared with the invalidator.
    pub fn cache(&self) -> &Arc<TtlCache<CacheValues>> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Media found in the repository after the search index missed them.
    pub fn index_miss_count(&self) -> u32 {
        self.misses.count()
    }

    fn media_criteria(&self) -> SearchCriteria {
        self.search
            .media_criteria()
            .unwrap_or_else(|| SearchCriteria::new(MEDIA_SEARCH_SCOPE))
    }

    // ========================================================================
    // BY ID
    // ========================================================================

    /// Resolve one media item.
    ///
    /// Non-positive ids resolve to `None` without touching any backend.
    /// Missing and trashed media resolve to `None` and are not cached.
    pub async fn resolve_by_id(&self, id: MediaId) -> MediaResult<Option<CacheValues>> {
        if id <= 0 {
            return Ok(None);
        }
        self.cache
            .get_or_compute(id, move || self.resolve_uncached(id))
            .await
    }

    async fn resolve_uncached(&self, id: MediaId) -> MediaResult<Option<CacheValues>> {
        let query = self.media_criteria().id(id).outside_recycle_bin().compile();

        if let ResolutionOutcome::Found(rows) = self.search.search(&query).await? {
            if let Some(row) = rows.first() {
                return Ok(Some(MediaSource::SearchRow(row).normalize()?));
            }
        }

        // Absence from the index is normal for deleted media, so nothing is
        // logged until the repository says the media exists.
        let Some(media) = self.repository.get_by_id(id).await? else {
            return Ok(None);
        };
        if media.trashed {
            return Ok(None);
        }

        self.misses.record();
        tracing::debug!(media_id = id, "Media resolved from the repository");

        let creator_name = self.users.display_name(media.creator_id).await?;
        let values = MediaSource::Entity {
            entity: &media,
            creator_name: creator_name.as_deref(),
        }
        .normalize()?;
        Ok(Some(values))
    }

    /// Resolve one media item into the caller-facing view.
    pub async fn get_by_id(&self, id: MediaId) -> MediaResult<Option<PublishedMedia>> {
        Ok(self.resolve_by_id(id).await?.map(PublishedMedia::new))
    }

    /// Whether media with this id resolves.
    pub async fn has_by_id(&self, id: MediaId) -> MediaResult<bool> {
        Ok(self.resolve_by_id(id).await?.is_some())
    }

    /// The parent of resolved media. Root media have none.
    pub async fn resolve_parent(&self, media: &CacheValues) -> MediaResult<Option<CacheValues>> {
        let parent_id = media
            .values()
            .get(fields::PARENT_ID)
            .and_then(|v| v.trim().parse::<MediaId>().ok());
        match parent_id {
            Some(parent_id) if parent_id > 0 => self.resolve_by_id(parent_id).await,
            _ => Ok(None),
        }
    }

    // ========================================================================
    // CHILDREN AND ROOTS
    // ========================================================================

    /// Resolve the children of a media item in sort order.
    ///
    /// When the index answers with nothing the result is empty; only an
    /// unavailable index sends the lookup to the legacy media tree.
    pub async fn resolve_children(&self, parent_id: MediaId) -> MediaResult<Vec<CacheValues>> {
        let query = self
            .media_criteria()
            .parent_id(parent_id)
            .outside_recycle_bin()
            .order_by_int(fields::SORT_ORDER)
            .compile();

        match self.search.search(&query).await? {
            ResolutionOutcome::Found(rows) => {
                let mut children = Vec::with_capacity(rows.len());
                for row in &rows {
                    let id = row.node_id().ok_or(NormalizeError::MissingNodeId)?;
                    let values = self
                        .cache
                        .get_or_compute(id, move || async move {
                            MediaSource::SearchRow(row).normalize().map(Some)
                        })
                        .await?;
                    children.extend(values);
                }
                Ok(children)
            }
            ResolutionOutcome::NotFound => Ok(Vec::new()),
            ResolutionOutcome::BackendUnavailable => self.legacy_children(parent_id).await,
        }
    }

    async fn legacy_children(&self, parent_id: MediaId) -> MediaResult<Vec<CacheValues>> {
        let Some(source) = &self.legacy else {
            return Ok(Vec::new());
        };
        let Some(tree) = source.get_media(parent_id, true).await? else {
            return Ok(Vec::new());
        };
        let Some(parent) = tree.find_by_id(parent_id) else {
            return Ok(Vec::new());
        };

        let retain = self.config.retain_legacy_nodes;
        let mut children = Vec::new();
        for child in parent.elements() {
            let Some(id) = child.media_id() else {
                continue;
            };
            let values = self
                .cache
                .get_or_compute(id, move || async move {
                    MediaSource::LegacyNode { node: child, retain }
                        .normalize()
                        .map(Some)
                })
                .await?;
            children.extend(values);
        }
        Ok(children)
    }

    /// Resolve the media at the root.
    ///
    /// Index rows are returned as they come and are not cached. Without an
    /// index every root from the repository is resolved by id.
    pub async fn resolve_roots(&self) -> MediaResult<Vec<CacheValues>> {
        let query = self
            .media_criteria()
            .parent_id(ROOT_PARENT_ID)
            .outside_recycle_bin()
            .compile();

        match self.search.search(&query).await? {
            ResolutionOutcome::Found(rows) => rows
                .iter()
                .map(|row| {
                    MediaSource::SearchRow(row)
                        .normalize()
                        .map_err(MediaCacheError::from)
                })
                .collect(),
            ResolutionOutcome::NotFound => Ok(Vec::new()),
            ResolutionOutcome::BackendUnavailable => {
                let roots = self.repository.get_root_media().await?;
                let mut resolved = Vec::with_capacity(roots.len());
                for root in roots {
                    resolved.extend(self.resolve_by_id(root.id).await?);
                }
                Ok(resolved)
            }
        }
    }

    // ========================================================================
    // LEGACY TREE
    // ========================================================================

    /// Resolve one media item from the legacy media tree.
    pub async fn resolve_legacy(&self, id: MediaId) -> MediaResult<Option<CacheValues>> {
        if id <= 0 {
            return Ok(None);
        }
        self.cache
            .get_or_compute(id, move || async move {
                let node = match &self.legacy {
                    Some(source) => source.get_media(id, false).await?,
                    None => None,
                };
                self.convert_legacy_media(node.as_ref(), id)
            })
            .await
    }

    /// Convert the answer of a legacy lookup for `id`.
    ///
    /// A document rooted at an `error` element, or a node without a usable
    /// id, means the media does not exist. No document at all is logged,
    /// since the media should have been found in one of the backends.
    pub fn convert_legacy_media(
        &self,
        node: Option<&LegacyNode>,
        id: MediaId,
    ) -> MediaResult<Option<CacheValues>> {
        match node {
            Some(node) if node.name.eq_ignore_ascii_case("error") => Ok(None),
            Some(node) => {
                let source = MediaSource::LegacyNode {
                    node,
                    retain: self.config.retain_legacy_nodes,
                };
                match source.normalize() {
                    Ok(values) => Ok(Some(values)),
                    Err(NormalizeError::MissingIdentity { .. }) => {
                        tracing::debug!(media_id = id, "Legacy media node has no id");
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            None => {
                tracing::warn!(
                    media_id = id,
                    "Could not retrieve media {id} from the search index or the legacy media source"
                );
                Ok(None)
            }
        }
    }

    /// The raw legacy tree node for a media item. Never cached.
    pub async fn legacy_node(&self, id: MediaId) -> MediaResult<Option<LegacyNode>> {
        let Some(source) = &self.legacy else {
            return Ok(None);
        };
        let Some(tree) = source.get_media(id, true).await? else {
            return Ok(None);
        };
        Ok(tree.find_by_id(id).cloned())
    }

    // ========================================================================
    // INVALIDATION
    // ========================================================================

    /// Drop cached entries for changed media and everything below it.
    pub fn on_changed(&self, id: MediaId) -> InvalidationReport {
        let report = self.invalidator.on_changed(id);
        tracing::debug!(
            media_id = id,
            removed = report.total(),
            "Media cache entries invalidated"
        );
        report
    }

    /// Drop every cached media entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // ========================================================================
    // UNSUPPORTED
    // ========================================================================

    pub fn by_key(&self, _key: MediaKey) -> MediaResult<Option<CacheValues>> {
        unsupported("by_key")
    }

    pub fn single_by_query(&self, _query: &str) -> MediaResult<Option<CacheValues>> {
        unsupported("single_by_query")
    }

    pub fn by_query(&self, _query: &str) -> MediaResult<Vec<CacheValues>> {
        unsupported("by_query")
    }

    pub fn create_navigator(&self) -> MediaResult<LegacyNode> {
        unsupported("create_navigator")
    }

    pub fn has_content(&self) -> MediaResult<bool> {
        unsupported("has_content")
    }

    pub fn by_content_type(&self, _alias: &str) -> MediaResult<Vec<CacheValues>> {
        unsupported("by_content_type")
    }
}
