//! In-memory collaborators for testing.
//!
//! Every mock counts its calls so tests can assert that a backend was never
//! asked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use mediacache_core::{
    LegacyChild, LegacyNode, MediaEntity, MediaId, MediaResult, SearchError, SearchResultRow, StorageError,
    UserId, ROOT_PARENT_ID,
};

use crate::collaborators::{LegacyMediaSource, MediaRepository, UserDirectory};
use crate::legacy_xml::parse_legacy_xml;
use crate::search::{SearchIndex, SearchQuery};

fn poisoned<T>(_: T) -> StorageError {
    StorageError::LockPoisoned
}

fn index_poisoned<T>(_: T) -> SearchError {
    SearchError::QueryFailed {
        reason: "mock index lock poisoned".to_string(),
    }
}

// ============================================================================
// MOCK SEARCH INDEX
// ============================================================================

/// Search index over a list of rows, evaluating compiled queries in memory.
#[derive(Debug, Default)]
pub struct MockSearchIndex {
    rows: RwLock<Vec<SearchResultRow>>,
    failure: RwLock<Option<SearchError>>,
    queries: RwLock<Vec<SearchQuery>>,
    calls: AtomicUsize,
}

impl MockSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&self, row: SearchResultRow) -> MediaResult<()> {
        self.rows.write().map_err(poisoned)?.push(row);
        Ok(())
    }

    /// Remove every row for a node id. Returns how many were removed.
    pub fn remove_node(&self, id: MediaId) -> MediaResult<usize> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        let before = rows.len();
        rows.retain(|row| row.node_id() != Some(id));
        Ok(before - rows.len())
    }

    /// Make every following search fail with `error`.
    pub fn fail_with(&self, error: SearchError) -> MediaResult<()> {
        *self.failure.write().map_err(poisoned)? = Some(error);
        Ok(())
    }

    /// Stop failing.
    pub fn recover(&self) -> MediaResult<()> {
        *self.failure.write().map_err(poisoned)? = None;
        Ok(())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The queries received so far, oldest first.
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries
            .read()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultRow>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.queries.write().map_err(index_poisoned)?.push(query.clone());
        if let Some(error) = self.failure.read().map_err(index_poisoned)?.clone() {
            return Err(error);
        }

        let mut matched: Vec<SearchResultRow> = self
            .rows
            .read()
            .map_err(index_poisoned)?
            .iter()
            .filter(|row| query.matches(row))
            .cloned()
            .collect();
        query.sort_rows(&mut matched);
        Ok(matched)
    }
}

// ============================================================================
// MOCK MEDIA REPOSITORY
// ============================================================================

/// Media repository backed by a map.
#[derive(Debug, Default)]
pub struct MockMediaRepository {
    media: RwLock<HashMap<MediaId, MediaEntity>>,
    calls: AtomicUsize,
}

impl MockMediaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: MediaEntity) -> MediaResult<()> {
        self.media.write().map_err(poisoned)?.insert(entity.id, entity);
        Ok(())
    }

    pub fn remove(&self, id: MediaId) -> MediaResult<Option<MediaEntity>> {
        Ok(self.media.write().map_err(poisoned)?.remove(&id))
    }

    /// Calls to either repository operation.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaRepository for MockMediaRepository {
    async fn get_by_id(&self, id: MediaId) -> MediaResult<Option<MediaEntity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.media.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn get_root_media(&self) -> MediaResult<Vec<MediaEntity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let media = self.media.read().map_err(poisoned)?;
        let mut roots: Vec<MediaEntity> = media
            .values()
            .filter(|m| m.parent_id == ROOT_PARENT_ID && !m.trashed)
            .cloned()
            .collect();
        roots.sort_by_key(|m| (m.sort_order, m.id));
        Ok(roots)
    }
}

// ============================================================================
// MOCK USER DIRECTORY
// ============================================================================

/// User directory backed by a map.
#[derive(Debug, Default)]
pub struct MockUserDirectory {
    names: RwLock<HashMap<UserId, String>>,
    calls: AtomicUsize,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, id: UserId, name: impl Into<String>) -> Self {
        if let Ok(mut names) = self.names.write() {
            names.insert(id, name.into());
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn display_name(&self, user_id: UserId) -> MediaResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.names.read().map_err(poisoned)?.get(&user_id).cloned())
    }
}

// ============================================================================
// MOCK LEGACY SOURCE
// ============================================================================

/// Legacy media source serving one tree per media id.
#[derive(Debug, Default)]
pub struct MockLegacySource {
    trees: RwLock<HashMap<MediaId, LegacyNode>>,
    calls: AtomicUsize,
}

impl MockLegacySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `tree` for lookups of `id`.
    pub fn insert(&self, id: MediaId, tree: LegacyNode) -> MediaResult<()> {
        self.trees.write().map_err(poisoned)?.insert(id, tree);
        Ok(())
    }

    /// Serve the parsed `xml` for lookups of `id`.
    pub fn insert_xml(&self, id: MediaId, xml: &str) -> MediaResult<()> {
        let tree = parse_legacy_xml(xml)?;
        self.insert(id, tree)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LegacyMediaSource for MockLegacySource {
    async fn get_media(&self, id: MediaId, deep: bool) -> MediaResult<Option<LegacyNode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let trees = self.trees.read().map_err(poisoned)?;
        let Some(tree) = trees.get(&id) else {
            return Ok(None);
        };
        if deep {
            return Ok(Some(tree.clone()));
        }

        // Shallow lookups keep properties but drop nested media.
        let mut shallow = tree.clone();
        shallow.children.retain(|child| match child {
            LegacyChild::Element(element) => element.media_id().is_none(),
            LegacyChild::Text(_) => true,
        });
        Ok(Some(shallow))
    }
}
