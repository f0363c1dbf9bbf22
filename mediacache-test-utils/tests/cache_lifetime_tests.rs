//! Cache lifetime as seen through the resolver, under paused time

use std::time::Duration;

use mediacache_test_utils::fixtures::*;
use mediacache_test_utils::*;

#[tokio::test(start_paused = true)]
async fn repeated_lookups_within_the_lifetime_hit_the_cache() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(1, -1, 0, "/-1/1/"))?;
    let resolver = backends.resolver(MediaCacheConfig::new().with_ttl(Duration::from_secs(30)))?;

    resolver.resolve_by_id(1).await?;
    tokio::time::advance(Duration::from_secs(29)).await;
    resolver.resolve_by_id(1).await?;
    assert_eq!(backends.index.call_count(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    resolver.resolve_by_id(1).await?;
    assert_eq!(backends.index.call_count(), 2);

    let stats = resolver.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn expired_entries_pick_up_backend_changes() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.repository.insert(sample_entity(2))?;
    let resolver = backends.resolver(cached_config())?;

    let first = resolver.get_by_id(2).await?.expect("media 2 resolves");
    backends.repository.insert(MediaEntity {
        name: "updated".to_string(),
        ..sample_entity(2)
    })?;

    tokio::time::advance(Duration::from_secs(61)).await;
    let second = resolver.get_by_id(2).await?.expect("media 2 resolves");

    assert_eq!(first.name(), "media 2");
    assert_eq!(second.name(), "updated");
    Ok(())
}

#[tokio::test]
async fn disabled_cache_asks_the_backends_every_time() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(3, -1, 0, "/-1/3/"))?;
    let resolver = backends.resolver(uncached_config())?;

    for _ in 0..3 {
        resolver.resolve_by_id(3).await?;
    }

    assert_eq!(backends.index.call_count(), 3);
    assert!(resolver.cache().is_empty());
    assert!(!resolver.config().cache_enabled());
    Ok(())
}

#[tokio::test]
async fn lifetime_is_read_from_configuration_lookup() -> MediaResult<()> {
    let config = MediaCacheConfig::from_lookup(|key| match key {
        "MEDIACACHE_CACHE_SECONDS" => Some("45".to_string()),
        "MEDIACACHE_INDEX_MISS_THRESHOLD" => Some("2".to_string()),
        _ => None,
    });
    let backends = TestBackends::new();
    let resolver = backends.resolver(config)?;

    assert_eq!(resolver.cache().ttl(), Some(Duration::from_secs(45)));
    assert_eq!(resolver.config().index_miss_threshold, 2);
    Ok(())
}

#[tokio::test]
async fn clearing_the_cache_forces_reloads() -> MediaResult<()> {
    let backends = TestBackends::new();
    backends.index.add_row(search_row(4, -1, 0, "/-1/4/"))?;
    let resolver = backends.resolver(cached_config())?;

    resolver.resolve_by_id(4).await?;
    resolver.clear_cache();
    resolver.resolve_by_id(4).await?;

    assert_eq!(backends.index.call_count(), 2);
    Ok(())
}
