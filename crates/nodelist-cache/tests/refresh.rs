mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use common::{MockFleet, MockNode};
use nodelist_cache::FreshnessBand;
use nodelist_reqwest::{ErrorKind, PATH_ABOUT_USAGE_SYSTEM, PATH_STATUS_CONFIG};
use serde_json::json;

#[tokio::test]
async fn test_cold_cache_waits_for_refresh() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha"), MockNode::gpu("beta")]).await;
    let cache = fleet.cache();

    assert_eq!(cache.band().await, FreshnessBand::Cold);
    let (roster, nodes) = cache.ensure_fresh().await;

    assert_eq!(roster.data.as_ref().map(|r| r.len()), Some(2));
    assert!(roster.fetched_at.is_some());
    assert_eq!(nodes.len(), 2);
    for record in nodes.values() {
        assert!(record.config.has_data());
        assert!(record.system_info.has_data());
        assert!(record.connectivity_check.has_data());
    }
    assert_eq!(cache.band().await, FreshnessBand::Fresh);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    fleet.set_roster_delay(Duration::from_millis(300));
    let cache = fleet.cache();

    let bands = futures::future::join_all((0..5).map(|_| cache.refresh_if_needed())).await;

    assert!(bands.iter().all(|band| *band == FreshnessBand::Cold));
    assert_eq!(fleet.roster_hits(), 1);
    assert_eq!(fleet.node_hits("alpha", PATH_STATUS_CONFIG), 1);
}

#[tokio::test]
async fn test_slow_refresh_detaches_after_grace() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    fleet.set_roster_delay(Duration::from_millis(3000));
    let cache = fleet.cache_with(fleet.cache_config().with_refresh_grace(1));

    let started = Instant::now();
    let (roster, _) = cache.ensure_fresh().await;
    assert!(started.elapsed() < Duration::from_millis(2000));
    assert!(roster.data.is_none());
    assert!(cache.is_refreshing().await);

    // Still cold, but the running cycle is joined rather than duplicated.
    assert_eq!(cache.refresh_if_needed().await, FreshnessBand::Cold);
    assert_eq!(fleet.roster_hits(), 1);

    cache.wait_idle().await;
    assert!(!cache.is_refreshing().await);
    assert_eq!(fleet.roster_hits(), 1);
    assert_eq!(cache.roster().await.data.map(|r| r.len()), Some(1));
}

#[tokio::test]
async fn test_refresh_now_joins_running_cycle() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    fleet.set_roster_delay(Duration::from_millis(800));
    let cache = fleet.cache();

    let background = cache.clone();
    let cold = tokio::spawn(async move { background.refresh_if_needed().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.is_refreshing().await);

    cache.refresh_now().await;
    assert!(!cache.is_refreshing().await);
    assert_eq!(fleet.roster_hits(), 1);
    assert_eq!(cache.roster().await.data.map(|r| r.len()), Some(1));

    assert_eq!(cold.await.unwrap(), FreshnessBand::Cold);
    assert_eq!(fleet.roster_hits(), 1);
}

#[tokio::test]
async fn test_refresh_now_after_shutdown_does_nothing() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    let cache = fleet.cache();

    cache.shutdown();
    cache.refresh_now().await;

    assert_eq!(fleet.roster_hits(), 0);
    assert!(cache.roster().await.data.is_none());
}

#[tokio::test]
async fn test_malformed_roster_entry_is_skipped() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha"), MockNode::gpu("beta")]).await;
    fleet.push_raw_entry(json!({ "hash": "broken", "address": null, "score": 0.5 }));
    fleet.push_raw_entry(json!({
        "hash": "typo",
        "address": "https://typo.example.org",
        "score": "0.5"
    }));
    let cache = fleet.cache();

    cache.refresh_now().await;

    let roster = cache.roster().await;
    assert!(roster.error.is_none());
    assert_eq!(roster.data.map(|r| r.len()), Some(2));
    assert!(cache.node("hash-alpha").await.unwrap().config.has_data());
    assert!(cache.node("hash-beta").await.unwrap().config.has_data());
    assert!(cache.node("broken").await.is_none());
}

#[tokio::test]
async fn test_warm_band_refreshes_in_background() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    let cache = fleet.cache_with(fleet.cache_config().with_thresholds(0, 3600));

    cache.refresh_now().await;
    assert_eq!(fleet.roster_hits(), 1);
    tokio::time::sleep(Duration::from_millis(10)).await;

    fleet.set_roster_delay(Duration::from_millis(500));
    let started = Instant::now();
    assert_eq!(cache.refresh_if_needed().await, FreshnessBand::Warm);
    assert!(started.elapsed() < Duration::from_millis(400));
    assert!(cache.is_refreshing().await);

    assert_eq!(cache.refresh_if_needed().await, FreshnessBand::Warm);

    cache.wait_idle().await;
    assert_eq!(fleet.roster_hits(), 2);
}

#[tokio::test]
async fn test_fresh_band_schedules_nothing() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    let cache = fleet.cache();

    cache.refresh_now().await;
    assert_eq!(cache.refresh_if_needed().await, FreshnessBand::Fresh);
    assert!(!cache.is_refreshing().await);
    assert_eq!(fleet.roster_hits(), 1);
}

#[tokio::test]
async fn test_node_failure_is_isolated() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha"), MockNode::gpu("beta")]).await;
    fleet.fail("beta", PATH_STATUS_CONFIG, StatusCode::INTERNAL_SERVER_ERROR);
    let cache = fleet.cache();

    cache.refresh_now().await;

    let alpha = cache.node("hash-alpha").await.unwrap();
    assert!(alpha.config.has_data());
    assert!(alpha.config.error.is_none());

    let beta = cache.node("hash-beta").await.unwrap();
    assert!(!beta.config.has_data());
    assert_eq!(
        beta.config.error.as_ref().map(|error| error.kind),
        Some(ErrorKind::Response)
    );
    assert!(beta.config.error_at.is_some());
    assert!(beta.system_info.has_data());
    assert!(beta.connectivity_check.has_data());
}

#[tokio::test]
async fn test_failure_keeps_previous_node_data() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    let cache = fleet.cache();

    cache.refresh_now().await;
    let before = cache.node("hash-alpha").await.unwrap();

    fleet.fail("alpha", PATH_ABOUT_USAGE_SYSTEM, StatusCode::BAD_GATEWAY);
    cache.refresh_now().await;
    let after = cache.node("hash-alpha").await.unwrap();

    assert_eq!(after.system_info.data, before.system_info.data);
    assert_eq!(after.system_info.fetched_at, before.system_info.fetched_at);
    assert!(after.system_info.error.is_some());
    assert!(after.config.error.is_none());
}

#[tokio::test]
async fn test_roster_failure_keeps_previous_roster() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    let cache = fleet.cache();

    cache.refresh_now().await;
    let before = cache.roster().await;

    fleet.set_roster_status(StatusCode::SERVICE_UNAVAILABLE);
    fleet.set_nodes(vec![MockNode::gpu("alpha"), MockNode::gpu("beta")]);
    cache.refresh_now().await;
    let after = cache.roster().await;

    assert_eq!(after.data, before.data);
    assert_eq!(after.fetched_at, before.fetched_at);
    assert_eq!(
        after.error.map(|error| error.kind),
        Some(ErrorKind::Response)
    );
    // Nodes of the previous roster are still refreshed.
    assert_eq!(fleet.node_hits("alpha", PATH_STATUS_CONFIG), 2);
    assert_eq!(fleet.node_hits("beta", PATH_STATUS_CONFIG), 0);
}

#[tokio::test]
async fn test_empty_roster_is_valid() {
    let fleet = MockFleet::start(vec![]).await;
    let cache = fleet.cache();

    cache.refresh_now().await;
    let roster = cache.roster().await;
    assert_eq!(roster.data.map(|r| r.len()), Some(0));
    assert!(roster.error.is_none());
}

#[tokio::test]
async fn test_refused_address_never_reaches_network() {
    let fleet = MockFleet::start(vec![
        MockNode::gpu("alpha"),
        MockNode::gpu("spoof").with_address("https://google.com/"),
    ])
    .await;
    let cache = fleet.cache();

    cache.refresh_now().await;

    let spoof = cache.node("hash-spoof").await.unwrap();
    assert!(!spoof.is_valid());
    assert_eq!(
        spoof.config.error.map(|error| error.kind),
        Some(ErrorKind::InvalidAddress)
    );
    assert_eq!(fleet.node_hits("spoof", PATH_STATUS_CONFIG), 0);
    assert!(cache.node("hash-alpha").await.unwrap().config.has_data());
    assert_eq!(
        cache.roster().await.data.map(|r| r.valid_address_count()),
        Some(1)
    );
}

#[tokio::test]
async fn test_records_follow_address_changes() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    let cache = fleet.cache();
    cache.refresh_now().await;

    let moved = format!("{}/nodes/relocated/", fleet.url());
    fleet.set_nodes(vec![MockNode::gpu("alpha").with_address(&moved)]);
    cache.refresh_now().await;

    let alpha = cache.node("hash-alpha").await.unwrap();
    assert_eq!(alpha.node_url, moved);
    assert_eq!(fleet.node_hits("relocated", PATH_STATUS_CONFIG), 1);
    assert!(alpha.config.has_data());
    assert_eq!(
        alpha.config.error.map(|error| error.kind),
        Some(ErrorKind::Response)
    );
}

#[tokio::test]
async fn test_shutdown_cancels_background_refresh() {
    let fleet = MockFleet::start(vec![MockNode::gpu("alpha")]).await;
    fleet.set_roster_delay(Duration::from_secs(10));
    let cache = fleet.cache_with(fleet.cache_config().with_refresh_grace(1));

    cache.refresh_if_needed().await;
    assert!(cache.is_refreshing().await);

    cache.shutdown();
    tokio::time::timeout(Duration::from_secs(2), cache.wait_idle())
        .await
        .unwrap();
    assert!(!cache.is_refreshing().await);
    assert!(cache.is_shutdown());

    // No new cycle starts after shutdown.
    assert_eq!(cache.refresh_if_needed().await, FreshnessBand::Cold);
    assert!(!cache.is_refreshing().await);
    assert_eq!(fleet.roster_hits(), 1);
}
