//! Mediacache Test Utilities
//!
//! Shared test infrastructure for the media cache workspace:
//! - Proptest generators for media entities and search rows
//! - Fixtures wiring the in-memory backends to a resolver
//! - Custom assertions for resolution results
//! - Tracing setup and a warning capture layer for log assertions

// Re-export mock backends from their source crate
pub use mediacache_storage::{
    MediaResolver, MockLegacySource, MockMediaRepository, MockSearchIndex, MockUserDirectory,
    PublishedMedia, SearchAccessor,
};

// Re-export core types for convenience
pub use mediacache_core::{
    fields, CacheValues, CanonicalValueMap, LegacyNode, MediaCacheConfig, MediaCacheError,
    MediaEntity, MediaId, MediaResult, MediaType, SearchError, SearchResultRow, Timestamp,
    UserProperty, ValueOrigin, ROOT_PARENT_ID,
};

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ============================================================================
// TRACING
// ============================================================================

/// Install a test-friendly fmt subscriber for the whole process.
///
/// Filtering follows `RUST_LOG` when set. Safe to call from every test.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mediacache_storage=debug,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Layer recording the message of every `WARN` event.
#[derive(Debug, Clone, Default)]
pub struct WarningCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl WarningCapture {
    /// Number of warnings seen so far.
    pub fn count(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Warnings whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages()
            .iter()
            .filter(|message| message.contains(needle))
            .count()
    }
}

impl<S: Subscriber> Layer<S> for WarningCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(visitor.message);
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

/// Capture warnings emitted on the current thread until the guard drops.
///
/// Use with a current-thread runtime so every poll stays on this thread.
pub fn capture_warnings() -> (WarningCapture, tracing::subscriber::DefaultGuard) {
    let capture = WarningCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for media cache types.

    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    // === Identity Generators ===

    /// Generate a resolvable media id.
    pub fn arb_media_id() -> impl Strategy<Value = MediaId> {
        1..100_000i32
    }

    /// Generate an id that never resolves.
    pub fn arb_non_positive_id() -> impl Strategy<Value = MediaId> {
        prop_oneof![Just(0), Just(-1), Just(i32::MIN), i32::MIN..=0]
    }

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (0i64..2_000_000_000).prop_filter_map("valid timestamp", |secs| {
            Utc.timestamp_opt(secs, 0).single()
        })
    }

    /// Generate a stored path ending in `id`, with up to four ancestors.
    pub fn arb_path(id: MediaId) -> impl Strategy<Value = String> {
        prop::collection::vec(arb_media_id(), 0..4).prop_map(move |ancestors| {
            let mut path = String::from("/-1/");
            for ancestor in ancestors.iter().filter(|a| **a != id) {
                path.push_str(&format!("{}/", ancestor));
            }
            path.push_str(&format!("{}/", id));
            path
        })
    }

    // === Property Generators ===

    /// Generate a property alias that collides with no system or index field.
    pub fn arb_alias() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9]{1,11}".prop_filter("not a system field", |alias| {
            !fields::SYSTEM
                .iter()
                .chain(
                    [
                        fields::INDEX_NODE_ID,
                        fields::LEGACY_NODE_ID,
                        fields::INDEX_PATH,
                    ]
                    .iter(),
                )
                .any(|system| system.eq_ignore_ascii_case(alias))
        })
    }

    pub fn arb_property_value() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ./_-]{0,24}"
    }

    pub fn arb_media_type() -> impl Strategy<Value = MediaType> {
        prop_oneof![
            Just((1031, "Folder")),
            Just((1032, "Image")),
            Just((1033, "File")),
        ]
        .prop_map(|(id, alias)| MediaType {
            id,
            alias: alias.to_string(),
        })
    }

    /// Generate properties whose aliases differ even ignoring case.
    pub fn arb_properties() -> impl Strategy<Value = Vec<UserProperty>> {
        prop::collection::vec((arb_alias(), arb_property_value()), 0..5).prop_map(|props| {
            let mut seen = HashSet::new();
            props
                .into_iter()
                .filter(|(alias, _)| seen.insert(alias.to_ascii_lowercase()))
                .map(|(alias, value)| UserProperty::text(alias, value))
                .collect()
        })
    }

    // === Entity Generators ===

    /// Generate a live media entity under the root.
    pub fn arb_media_entity() -> impl Strategy<Value = MediaEntity> {
        (
            arb_media_id(),
            arb_uuid(),
            0..100i32,
            arb_timestamp(),
            arb_media_type(),
            "[A-Za-z][A-Za-z0-9 ]{0,20}",
            arb_properties(),
        )
            .prop_map(
                |(id, key, sort_order, created, media_type, name, properties)| MediaEntity {
                    id,
                    key,
                    parent_id: ROOT_PARENT_ID,
                    level: 1,
                    creator_id: 0,
                    sort_order,
                    create_date: created,
                    update_date: created,
                    name,
                    path: format!("/-1/{}/", id),
                    media_type,
                    trashed: false,
                    properties,
                },
            )
    }

    /// Generate a search row as the index would store it.
    pub fn arb_search_row() -> impl Strategy<Value = SearchResultRow> {
        arb_media_id()
            .prop_flat_map(|id| (Just(id), arb_path(id), 0..100i32, arb_properties()))
            .prop_map(|(id, path, sort_order, properties)| {
                let mut map = CanonicalValueMap::new();
                map.insert(fields::INDEX_NODE_ID, id.to_string());
                map.insert(fields::ID, id.to_string());
                map.insert(fields::INDEX_PATH, path);
                map.insert(fields::SORT_ORDER, sort_order.to_string());
                map.insert(fields::NODE_TYPE_ALIAS, "Image");
                for property in &properties {
                    if let Some(value) = property.value_string() {
                        map.insert(property.alias.as_str(), value);
                    }
                }
                SearchResultRow::new(map)
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common resolution scenarios.

    use super::*;
    use std::time::Duration;

    /// A legacy folder (1050) holding two images and a non-media element.
    pub const LEGACY_FOLDER_XML: &str = r#"<Folder id="1050" parentID="-1" level="1" path="/-1/1050/" nodeName="Photos" sortOrder="0">
  <contents>holiday</contents>
  <Image id="1051" parentID="1050" level="2" path="/-1/1050/1051/" nodeName="Beach" sortOrder="0">
    <umbracoFile>/media/beach.jpg</umbracoFile>
  </Image>
  <Image id="1052" parentID="1050" level="2" path="/-1/1050/1052/" nodeName="Dunes" sortOrder="1">
    <umbracoFile>/media/dunes.jpg</umbracoFile>
  </Image>
</Folder>"#;

    /// Config with a one-minute cache lifetime.
    pub fn cached_config() -> MediaCacheConfig {
        MediaCacheConfig::new().with_ttl(Duration::from_secs(60))
    }

    /// Config with caching disabled.
    pub fn uncached_config() -> MediaCacheConfig {
        MediaCacheConfig::new().with_cache_disabled()
    }

    /// Root-level image titled "Hello", created by user 0.
    pub fn sample_entity(id: MediaId) -> MediaEntity {
        MediaEntity {
            id,
            key: Uuid::nil(),
            parent_id: ROOT_PARENT_ID,
            level: 1,
            creator_id: 0,
            sort_order: 0,
            create_date: Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).single().unwrap_or_default(),
            update_date: Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).single().unwrap_or_default(),
            name: format!("media {}", id),
            path: format!("/-1/{}/", id),
            media_type: MediaType {
                id: 1032,
                alias: "Image".to_string(),
            },
            trashed: false,
            properties: vec![
                UserProperty::text("title", "Hello"),
                UserProperty::new("umbracoBytes", Some(serde_json::json!(2048))),
            ],
        }
    }

    pub fn trashed_entity(id: MediaId) -> MediaEntity {
        MediaEntity {
            trashed: true,
            path: format!("/-1/-21/{}/", id),
            ..sample_entity(id)
        }
    }

    /// A search row with the fields the index stores for media.
    pub fn search_row(id: MediaId, parent_id: MediaId, sort_order: i32, path: &str) -> SearchResultRow {
        let mut map = CanonicalValueMap::new();
        map.insert(fields::INDEX_NODE_ID, id.to_string());
        map.insert(fields::ID, id.to_string());
        map.insert(fields::PARENT_ID, parent_id.to_string());
        map.insert(fields::SORT_ORDER, sort_order.to_string());
        map.insert(fields::INDEX_PATH, path);
        map.insert(fields::NODE_TYPE_ALIAS, "Image");
        map.insert(fields::NODE_NAME, format!("media {}", id));
        SearchResultRow::new(map)
    }

    /// A search row carrying one property in plain and raw form.
    pub fn search_row_with_raw(id: MediaId, alias: &str, plain: &str, raw: &str) -> SearchResultRow {
        let mut map = search_row(id, ROOT_PARENT_ID, 0, &format!("/-1/{}/", id)).fields;
        map.insert(alias, plain);
        map.insert(format!("{}{}", fields::RAW_PREFIX, alias), raw);
        SearchResultRow::new(map)
    }

    /// In-memory backends sharing state with the resolvers built from them.
    #[derive(Debug, Clone)]
    pub struct TestBackends {
        pub index: Arc<MockSearchIndex>,
        pub repository: Arc<MockMediaRepository>,
        pub users: Arc<MockUserDirectory>,
        pub legacy: Arc<MockLegacySource>,
    }

    impl Default for TestBackends {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestBackends {
        pub fn new() -> Self {
            Self {
                index: Arc::new(MockSearchIndex::new()),
                repository: Arc::new(MockMediaRepository::new()),
                users: Arc::new(MockUserDirectory::new().with_user(0, "Administrator")),
                legacy: Arc::new(MockLegacySource::new()),
            }
        }

        /// Resolver over the mock index, repository and legacy source.
        pub fn resolver(&self, config: MediaCacheConfig) -> MediaResult<MediaResolver> {
            self.build(config, SearchAccessor::new(self.index.clone()))
        }

        /// Resolver for a process without a configured search index.
        pub fn resolver_without_index(&self, config: MediaCacheConfig) -> MediaResult<MediaResolver> {
            self.build(config, SearchAccessor::unconfigured())
        }

        fn build(&self, config: MediaCacheConfig, search: SearchAccessor) -> MediaResult<MediaResolver> {
            Ok(
                MediaResolver::new(config, search, self.repository.clone(), self.users.clone())?
                    .with_legacy_source(self.legacy.clone()),
            )
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for resolution results.

    use super::*;

    /// Assert that a lookup resolved media with the given id.
    #[track_caller]
    pub fn assert_resolved(result: &MediaResult<Option<CacheValues>>, id: MediaId) {
        match result {
            Ok(Some(values)) => assert_eq!(values.id(), Some(id), "Resolved the wrong media"),
            other => panic!("Expected media {}, got: {:?}", id, other),
        }
    }

    /// Assert that a lookup completed without finding anything.
    #[track_caller]
    pub fn assert_not_resolved(result: &MediaResult<Option<CacheValues>>) {
        match result {
            Ok(None) => {}
            other => panic!("Expected no media, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_origin(values: &CacheValues, origin: ValueOrigin) {
        assert_eq!(values.origin(), origin, "Wrong value origin for {:?}", values.id());
    }

    /// Assert that a result list holds exactly these ids, in order.
    #[track_caller]
    pub fn assert_ids(values: &[CacheValues], expected: &[MediaId]) {
        let ids: Vec<Option<MediaId>> = values.iter().map(CacheValues::id).collect();
        let expected: Vec<Option<MediaId>> = expected.iter().copied().map(Some).collect();
        assert_eq!(ids, expected, "Wrong media ids");
    }

    /// Assert that an operation was rejected as unsupported.
    #[track_caller]
    pub fn assert_unsupported<T: fmt::Debug>(result: &MediaResult<T>, operation: &str) {
        match result {
            Err(MediaCacheError::Unsupported { operation: op }) => {
                assert_eq!(*op, operation, "Wrong unsupported operation");
            }
            other => panic!("Expected Unsupported({}), got: {:?}", operation, other),
        }
    }

    #[track_caller]
    pub fn assert_search_error<T: fmt::Debug>(result: &MediaResult<T>) {
        match result {
            Err(MediaCacheError::Search(_)) => {}
            other => panic!("Expected Search error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_error<T: fmt::Debug>(result: &MediaResult<T>) {
        match result {
            Err(MediaCacheError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sample_entity_fixture() {
        let entity = fixtures::sample_entity(1234);
        assert_eq!(entity.path, "/-1/1234/");
        assert!(!entity.trashed);
        assert_eq!(entity.properties[0].value_string().as_deref(), Some("Hello"));
    }

    #[test]
    fn test_trashed_entity_fixture() {
        let entity = fixtures::trashed_entity(7);
        assert!(entity.trashed);
        assert!(entity.path.starts_with(mediacache_core::RECYCLE_BIN_PATH_PREFIX));
    }

    #[test]
    fn test_search_row_fixture() {
        let row = fixtures::search_row(9, 5, 3, "/-1/5/9/");
        assert_eq!(row.node_id(), Some(9));
        assert_eq!(row.get("sortOrder"), Some("3"));
    }

    #[test]
    fn test_backends_build_resolver() {
        let backends = fixtures::TestBackends::new();
        assert!(backends.resolver(fixtures::cached_config()).is_ok());
        assert!(backends
            .resolver_without_index(fixtures::uncached_config())
            .is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let backends = fixtures::TestBackends::new();
        let result = backends.resolver(MediaCacheConfig::new().with_miss_threshold(0));
        assertions::assert_config_error(&result);
    }

    #[test]
    fn test_warning_capture_counts_only_warnings() {
        let (capture, _guard) = capture_warnings();
        tracing::info!("not counted");
        tracing::warn!(media_id = 3, "Counted {}", 3);
        tracing::error!("not counted either");

        assert_eq!(capture.count(), 1);
        assert_eq!(capture.messages(), vec!["Counted 3".to_string()]);
        assert_eq!(capture.count_containing("Counted"), 1);
    }

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_paths_end_with_id(
            (id, path) in generators::arb_media_id()
                .prop_flat_map(|id| (Just(id), generators::arb_path(id)))
        ) {
            prop_assert!(path.starts_with("/-1/"));
            let suffix = format!("/{}/", id);
            prop_assert!(path.ends_with(&suffix));
        }

        #[test]
        fn prop_generated_rows_have_node_ids(row in generators::arb_search_row()) {
            prop_assert!(row.node_id().is_some());
        }

        #[test]
        fn prop_generated_entities_are_live(entity in generators::arb_media_entity()) {
            prop_assert!(!entity.trashed);
            prop_assert_eq!(entity.parent_id, ROOT_PARENT_ID);
        }

        #[test]
        fn prop_generated_aliases_differ_ignoring_case(props in generators::arb_properties()) {
            let mut lowered: Vec<String> =
                props.iter().map(|p| p.alias.to_ascii_lowercase()).collect();
            lowered.sort();
            lowered.dedup();
            prop_assert_eq!(lowered.len(), props.len());
        }
    }
}
