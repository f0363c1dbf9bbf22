//! End-to-end resolution over the in-memory backends

use mediacache_core::RECYCLE_BIN_PATH_PREFIX;
use mediacache_storage::SearchClause;
use mediacache_test_utils::assertions::*;
use mediacache_test_utils::fixtures::*;
use mediacache_test_utils::generators::arb_non_positive_id;
use mediacache_test_utils::*;
use proptest::prelude::*;
use uuid::Uuid;

// ============================================================================
// BY ID
// ============================================================================

#[tokio::test]
async fn non_positive_ids_never_reach_a_backend() -> MediaResult<()> {
    let backends = TestBackends::new();
    let resolver = backends.resolver(cached_config())?;

    for id in [0, -1, -21, i32::MIN] {
        assert_not_resolved(&resolver.resolve_by_id(id).await);
    }

    assert_eq!(backends.index.call_count(), 0);
    assert_eq!(backends.repository.call_count(), 0);
    assert!(resolver.cache().is_empty());
    Ok(())
}

#[tokio::test]
async fn search_index_answer_is_authoritative() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(10, -1, 0, "/-1/10/"))?;
    backends.repository.insert(sample_entity(10))?;
    let resolver = backends.resolver(cached_config())?;

    let result = resolver.resolve_by_id(10).await;

    assert_resolved(&result, 10);
    if let Ok(Some(values)) = &result {
        assert_origin(values, ValueOrigin::SearchIndex);
        assert_eq!(values.values().get("nodeName"), Some("media 10"));
    }
    assert_eq!(backends.repository.call_count(), 0);
    assert_eq!(resolver.index_miss_count(), 0);
    Ok(())
}

#[tokio::test]
async fn by_id_query_excludes_the_recycle_bin() -> MediaResult<()> {
    let backends = TestBackends::new();
    let resolver = backends.resolver(uncached_config())?;

    resolver.resolve_by_id(42).await?;

    let queries = backends.index.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].clauses.contains(&SearchClause::NodeId(42)));
    assert!(queries[0].clauses.contains(&SearchClause::NotFieldPrefix {
        field: fields::INDEX_PATH.to_string(),
        prefix: RECYCLE_BIN_PATH_PREFIX.to_string(),
    }));
    Ok(())
}

#[tokio::test]
async fn repository_fallback_counts_one_index_miss() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.repository.insert(sample_entity(20))?;
    let resolver = backends.resolver(cached_config())?;

    let result = resolver.resolve_by_id(20).await;
    assert_resolved(&result, 20);
    assert_eq!(resolver.index_miss_count(), 1);

    // Served from the cache, so no second miss.
    resolver.resolve_by_id(20).await?;
    assert_eq!(resolver.index_miss_count(), 1);
    assert_eq!(backends.repository.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn missing_and_trashed_media_resolve_to_none() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.repository.insert(trashed_entity(30))?;
    let resolver = backends.resolver(cached_config())?;

    assert_not_resolved(&resolver.resolve_by_id(30).await);
    assert_not_resolved(&resolver.resolve_by_id(31).await);

    assert_eq!(resolver.index_miss_count(), 0);
    assert!(resolver.cache().is_empty());
    Ok(())
}

#[tokio::test]
async fn repository_media_round_trips_properties() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.repository.insert(sample_entity(40))?;
    let resolver = backends.resolver(uncached_config())?;

    let media = resolver.get_by_id(40).await?.expect("media 40 resolves");

    assert_eq!(media.origin(), ValueOrigin::Repository);
    assert_eq!(media.property("title"), Some("Hello"));
    assert_eq!(media.property("TITLE"), Some("Hello"));
    assert_eq!(media.property("umbracoBytes"), Some("2048"));
    assert_eq!(media.name(), "media 40");
    assert_eq!(media.path(), "/-1/40/");
    assert_eq!(media.key(), Some(Uuid::nil()));
    assert_eq!(
        media.cache_values().values().get("creatorName"),
        Some("Administrator")
    );
    Ok(())
}

#[tokio::test]
async fn raw_index_value_takes_precedence() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends
        .index
        .add_row(search_row_with_raw(50, "bodyText", "plain text", "<p>rich text</p>"))?;
    let resolver = backends.resolver(uncached_config())?;

    let media = resolver.get_by_id(50).await?.expect("media 50 resolves");

    assert_eq!(media.property("bodyText"), Some("<p>rich text</p>"));
    assert_eq!(media.property("missing"), None);
    assert!(media.has_property("bodytext"));
    Ok(())
}

#[tokio::test]
async fn parent_resolution_stops_at_the_root() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(5, -1, 0, "/-1/5/"))?;
    backends.index.add_row(search_row(9, 5, 0, "/-1/5/9/"))?;
    let resolver = backends.resolver(cached_config())?;

    let child = resolver.resolve_by_id(9).await?.expect("media 9 resolves");
    let parent = resolver.resolve_parent(&child).await?.expect("parent resolves");
    assert_eq!(parent.id(), Some(5));
    assert!(resolver.resolve_parent(&parent).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn query_failures_propagate() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.fail_with(SearchError::QueryFailed {
        reason: "syntax".to_string(),
    })?;
    backends.repository.insert(sample_entity(60))?;
    let resolver = backends.resolver(cached_config())?;

    assert_search_error(&resolver.resolve_by_id(60).await);
    assert_eq!(backends.repository.call_count(), 0);
    Ok(())
}

// ============================================================================
// CHILDREN AND ROOTS
// ============================================================================

#[tokio::test]
async fn children_come_back_in_sort_order_and_are_cached() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(5, -1, 0, "/-1/5/"))?;
    backends.index.add_row(search_row(11, 5, 2, "/-1/5/11/"))?;
    backends.index.add_row(search_row(12, 5, 1, "/-1/5/12/"))?;
    backends.index.add_row(search_row(13, 5, 10, "/-1/5/13/"))?;
    let resolver = backends.resolver(cached_config())?;

    let children = resolver.resolve_children(5).await?;
    assert_ids(&children, &[12, 11, 13]);

    let calls = backends.index.call_count();
    assert_resolved(&resolver.resolve_by_id(13).await, 13);
    assert_eq!(backends.index.call_count(), calls);
    Ok(())
}

#[tokio::test]
async fn empty_index_answer_means_no_children() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.legacy.insert_xml(1050, LEGACY_FOLDER_XML)?;
    let resolver = backends.resolver(cached_config())?;

    assert!(resolver.resolve_children(1050).await?.is_empty());
    assert_eq!(backends.legacy.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn unavailable_index_falls_back_to_legacy_children() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.fail_with(SearchError::IndexClosed {
        reason: "shutting down".to_string(),
    })?;
    backends.legacy.insert_xml(1050, LEGACY_FOLDER_XML)?;
    let resolver = backends.resolver(cached_config())?;

    let children = resolver.resolve_children(1050).await?;

    assert_ids(&children, &[1051, 1052]);
    for child in &children {
        assert_origin(child, ValueOrigin::LegacyTree);
    }
    assert_eq!(resolver.cache().len(), 2);
    Ok(())
}

#[tokio::test]
async fn roots_come_from_the_index_uncached() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(1, -1, 0, "/-1/1/"))?;
    backends.index.add_row(search_row(2, -1, 1, "/-1/2/"))?;
    backends.index.add_row(search_row(3, 1, 0, "/-1/1/3/"))?;
    let resolver = backends.resolver(cached_config())?;

    let roots = resolver.resolve_roots().await?;

    assert_eq!(roots.len(), 2);
    assert!(roots.iter().all(|r| r.values().get("parentID") == Some("-1")));
    assert!(resolver.cache().is_empty());
    assert_eq!(backends.repository.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn roots_without_an_index_come_from_the_repository() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.repository.insert(MediaEntity {
        sort_order: 1,
        ..sample_entity(70)
    })?;
    backends.repository.insert(sample_entity(71))?;
    backends.repository.insert(trashed_entity(72))?;
    let resolver = backends.resolver_without_index(cached_config())?;

    let roots = resolver.resolve_roots().await?;

    assert_ids(&roots, &[71, 70]);
    assert_eq!(resolver.cache().len(), 2);
    assert_eq!(backends.index.call_count(), 0);
    Ok(())
}

// ============================================================================
// LEGACY TREE
// ============================================================================

#[tokio::test]
async fn legacy_error_document_resolves_to_none() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends
        .legacy
        .insert_xml(80, r#"<error>No media is matching '80'</error>"#)?;
    let resolver = backends.resolver(cached_config())?;

    assert_not_resolved(&resolver.resolve_legacy(80).await);
    Ok(())
}

#[tokio::test]
async fn legacy_node_without_id_resolves_to_none() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.legacy.insert_xml(
        77,
        r#"<Image nodeName="orphan"><umbracoFile>/a.jpg</umbracoFile></Image>"#,
    )?;
    let resolver = backends.resolver(cached_config())?;

    assert_not_resolved(&resolver.resolve_legacy(77).await);
    assert!(resolver.cache().is_empty());
    Ok(())
}

#[tokio::test]
async fn legacy_media_resolves_and_caches() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.legacy.insert_xml(1050, LEGACY_FOLDER_XML)?;
    let resolver = backends.resolver(cached_config())?;

    assert_resolved(&resolver.resolve_legacy(1050).await, 1050);
    assert_resolved(&resolver.resolve_legacy(1050).await, 1050);
    assert_eq!(backends.legacy.call_count(), 1);

    let node = resolver.legacy_node(1050).await?.expect("legacy node");
    assert_eq!(node.media_id(), Some(1050));
    Ok(())
}

// ============================================================================
// INVALIDATION
// ============================================================================

#[tokio::test]
async fn change_notification_clears_entry_and_descendants() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(5, -1, 0, "/-1/5/"))?;
    backends.index.add_row(search_row(9, 5, 0, "/-1/5/9/"))?;
    backends.index.add_row(search_row(7, -1, 1, "/-1/7/"))?;
    let resolver = backends.resolver(cached_config())?;
    for id in [5, 9, 7] {
        resolver.resolve_by_id(id).await?;
    }
    assert_eq!(resolver.cache().len(), 3);

    let report = resolver.on_changed(5);

    assert!(report.direct);
    assert_eq!(report.descendants, 1);
    assert_eq!(resolver.cache().len(), 1);

    let calls = backends.index.call_count();
    resolver.resolve_by_id(7).await?;
    assert_eq!(backends.index.call_count(), calls);
    resolver.resolve_by_id(9).await?;
    assert_eq!(backends.index.call_count(), calls + 1);
    Ok(())
}

#[tokio::test]
async fn changed_media_is_reloaded() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.repository.insert(sample_entity(90))?;
    let resolver = backends.resolver(cached_config())?;
    resolver.resolve_by_id(90).await?;

    backends.repository.insert(MediaEntity {
        name: "renamed".to_string(),
        ..sample_entity(90)
    })?;
    let stale = resolver.get_by_id(90).await?.expect("cached media");
    assert_eq!(stale.name(), "media 90");

    resolver.on_changed(90);
    let fresh = resolver.get_by_id(90).await?.expect("reloaded media");
    assert_eq!(fresh.name(), "renamed");
    Ok(())
}

#[tokio::test]
async fn removed_index_media_stays_cached_until_changed() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(5, -1, 0, "/-1/5/"))?;
    let resolver = backends.resolver(cached_config())?;
    assert_resolved(&resolver.resolve_by_id(5).await, 5);

    assert_eq!(backends.index.remove_node(5)?, 1);
    assert_resolved(&resolver.resolve_by_id(5).await, 5);

    resolver.on_changed(5);
    assert_not_resolved(&resolver.resolve_by_id(5).await);
    Ok(())
}

#[tokio::test]
async fn deleted_repository_media_resolves_to_none_after_change() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.repository.insert(sample_entity(91))?;
    let resolver = backends.resolver(cached_config())?;
    assert_resolved(&resolver.resolve_by_id(91).await, 91);

    assert!(backends.repository.remove(91)?.is_some());
    assert_resolved(&resolver.resolve_by_id(91).await, 91);

    resolver.on_changed(91);
    assert_not_resolved(&resolver.resolve_by_id(91).await);
    assert_eq!(resolver.index_miss_count(), 1);
    Ok(())
}

// ============================================================================
// UNSUPPORTED
// ============================================================================

#[test]
fn unsupported_lookups_are_rejected() -> MediaResult<()> {
    let backends = TestBackends::new();
    let resolver = backends.resolver(cached_config())?;

    assert_unsupported(&resolver.by_key(Uuid::nil()), "by_key");
    assert_unsupported(&resolver.single_by_query("//Image"), "single_by_query");
    assert_unsupported(&resolver.by_query("//Image"), "by_query");
    assert_unsupported(&resolver.create_navigator(), "create_navigator");
    assert_unsupported(&resolver.has_content(), "has_content");
    assert_unsupported(&resolver.by_content_type("Image"), "by_content_type");
    Ok(())
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_non_positive_ids_resolve_to_none(id in arb_non_positive_id()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let backends = TestBackends::new();
        let resolver = backends.resolver(cached_config()).expect("resolver");

        let result = runtime.block_on(resolver.resolve_by_id(id));

        prop_assert!(matches!(result, Ok(None)));
        prop_assert_eq!(backends.index.call_count(), 0);
        prop_assert_eq!(backends.repository.call_count(), 0);
    }
}
