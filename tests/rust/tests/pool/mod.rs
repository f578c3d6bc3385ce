//! ConnectionPoolManager behavior tests
//!
//! Covers lazy pool creation, bounded reuse, backpressure policies,
//! health-threshold retirement, and shutdown semantics.

use std::sync::Arc;
use std::time::Duration;

use mcpool_core::{Error, ExhaustionPolicy, PoolConfig, ToolTransport};
use mcpool_engine::ConnectionPoolManager;
use pretty_assertions::assert_eq;
use tests::{FailingOpenTransport, MockTransport};

fn pool_with(transport: Arc<MockTransport>, config: PoolConfig) -> Arc<ConnectionPoolManager> {
    Arc::new(ConnectionPoolManager::new(
        config,
        transport as Arc<dyn ToolTransport>,
    ))
}

// ============================================================================
// Lazy creation and reuse
// ============================================================================

#[tokio::test]
async fn test_unknown_server_gets_a_pool_lazily() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(Arc::clone(&transport), PoolConfig::default());

    assert_eq!(pool.known_servers(), 0);

    let conn = pool.get_connection("never-seen-before").await.unwrap();
    assert_eq!(conn.server_name, "never-seen-before");
    assert!(conn.in_use);
    assert!(conn.is_healthy);

    assert_eq!(pool.known_servers(), 1);
    let stats = pool.get_stats().await;
    assert_eq!(stats.total_connections, 1);
    assert_eq!(stats.active_connections, 1);
    assert!(stats.servers.contains_key("never-seen-before"));
}

#[tokio::test]
async fn test_returned_connection_is_reused() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(Arc::clone(&transport), PoolConfig::default());

    let first = pool.get_connection("github").await.unwrap();
    pool.return_connection(&first, true).await;

    let second = pool.get_connection("github").await.unwrap();
    assert_eq!(second.connection_id, first.connection_id);
    assert_eq!(second.use_count, 2);
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test]
async fn test_servers_do_not_share_connections() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(Arc::clone(&transport), PoolConfig::default());

    let a = pool.get_connection("github").await.unwrap();
    let b = pool.get_connection("jira").await.unwrap();
    assert_ne!(a.connection_id, b.connection_id);

    let stats = pool.get_stats().await;
    assert_eq!(stats.servers["github"].total_connections, 1);
    assert_eq!(stats.servers["jira"].total_connections, 1);
    assert_eq!(stats.total_connections, 2);
}

#[tokio::test]
async fn test_creation_failure_surfaces_as_typed_error() {
    let pool = Arc::new(ConnectionPoolManager::new(
        PoolConfig::default(),
        Arc::new(FailingOpenTransport) as Arc<dyn ToolTransport>,
    ));

    let err = pool.get_connection("github").await.unwrap_err();
    match err {
        Error::ConnectionCreationFailed { server, reason } => {
            assert_eq!(server, "github");
            assert!(reason.contains("refused to dial"));
        }
        other => panic!("expected ConnectionCreationFailed, got {other:?}"),
    }

    // The failed attempt must not leak a cap slot
    let stats = pool.get_stats().await;
    assert_eq!(stats.total_connections, 0);
}

// ============================================================================
// Backpressure at the cap
// ============================================================================

#[tokio::test]
async fn test_fail_fast_when_saturated() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(
        Arc::clone(&transport),
        PoolConfig::default()
            .with_max_connections_per_server(1)
            .with_exhaustion_policy(ExhaustionPolicy::FailFast),
    );

    let _held = pool.get_connection("github").await.unwrap();
    let err = pool.get_connection("github").await.unwrap_err();
    assert!(matches!(err, Error::PoolExhausted { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_block_times_out_with_pool_exhausted() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(
        Arc::clone(&transport),
        PoolConfig::default()
            .with_max_connections_per_server(1)
            .with_acquire_timeout(Duration::from_millis(100)),
    );

    let _held = pool.get_connection("github").await.unwrap();
    let err = pool.get_connection("github").await.unwrap_err();
    match err {
        Error::PoolExhausted { server, waited } => {
            assert_eq!(server, "github");
            assert!(waited >= Duration::from_millis(100));
        }
        other => panic!("expected PoolExhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_blocked_acquirer_receives_returned_connection() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(
        Arc::clone(&transport),
        PoolConfig::default()
            .with_max_connections_per_server(1)
            .with_acquire_timeout(Duration::from_secs(5)),
    );

    let held = pool.get_connection("github").await.unwrap();

    let waiter_pool = Arc::clone(&pool);
    let waiter = tokio::spawn(async move { waiter_pool.get_connection("github").await });

    // Give the waiter time to park on the saturated pool
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    pool.return_connection(&held, true).await;

    let handed_off = waiter.await.unwrap().unwrap();
    assert_eq!(handed_off.connection_id, held.connection_id);
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unhealthy_return_frees_slot_for_new_connection() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(
        Arc::clone(&transport),
        PoolConfig::default()
            .with_max_connections_per_server(1)
            .with_acquire_timeout(Duration::from_secs(5))
            .with_failure_threshold(1),
    );

    let held = pool.get_connection("github").await.unwrap();

    let waiter_pool = Arc::clone(&pool);
    let waiter = tokio::spawn(async move { waiter_pool.get_connection("github").await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Failed return retires the connection; the waiter gets a fresh one
    pool.return_connection(&held, false).await;

    let fresh = waiter.await.unwrap().unwrap();
    assert_ne!(fresh.connection_id, held.connection_id);
    assert_eq!(transport.open_count(), 2);
}

// ============================================================================
// Health-threshold retirement
// ============================================================================

#[tokio::test]
async fn test_connection_retired_at_failure_threshold() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(
        Arc::clone(&transport),
        PoolConfig::default().with_failure_threshold(2),
    );

    let first = pool.get_connection("github").await.unwrap();
    pool.return_connection(&first, false).await;

    // One failure is below the threshold; same connection is re-lent
    let again = pool.get_connection("github").await.unwrap();
    assert_eq!(again.connection_id, first.connection_id);
    pool.return_connection(&again, false).await;

    // Second consecutive failure retires it
    let replacement = pool.get_connection("github").await.unwrap();
    assert_ne!(replacement.connection_id, first.connection_id);

    let stats = pool.get_stats().await;
    assert_eq!(stats.unhealthy_retired, 1);
    assert_eq!(stats.total_connections, 1);
}

#[tokio::test]
async fn test_successful_return_resets_failure_count() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(
        Arc::clone(&transport),
        PoolConfig::default().with_failure_threshold(2),
    );

    let conn = pool.get_connection("github").await.unwrap();
    pool.return_connection(&conn, false).await;

    let conn = pool.get_connection("github").await.unwrap();
    pool.return_connection(&conn, true).await;

    // The earlier failure no longer counts toward retirement
    let conn = pool.get_connection("github").await.unwrap();
    pool.return_connection(&conn, false).await;

    let survivor = pool.get_connection("github").await.unwrap();
    assert_eq!(survivor.connection_id, conn.connection_id);
    assert_eq!(pool.get_stats().await.unhealthy_retired, 0);
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_close_all_releases_everything_and_fails_fast_after() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(Arc::clone(&transport), PoolConfig::default());

    let lent = pool.get_connection("github").await.unwrap();
    let idle = pool.get_connection("jira").await.unwrap();
    pool.return_connection(&idle, true).await;

    pool.close_all().await;
    assert!(pool.is_closed());

    let stats = pool.get_stats().await;
    assert_eq!(stats.total_connections, 0);
    assert_eq!(stats.active_connections, 0);

    let err = pool.get_connection("github").await.unwrap_err();
    assert!(matches!(err, Error::ManagerClosed));

    // A late return from an in-flight call is a harmless no-op
    pool.return_connection(&lent, true).await;
    assert_eq!(pool.get_stats().await.total_connections, 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_during_connection_creation_yields_manager_closed() {
    let transport = Arc::new(MockTransport::new());
    transport.set_open_delay(Duration::from_millis(100));
    let pool = pool_with(Arc::clone(&transport), PoolConfig::default());

    // Park an acquirer inside the creation path, then close underneath it
    let acquirer_pool = Arc::clone(&pool);
    let acquirer = tokio::spawn(async move { acquirer_pool.get_connection("github").await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!acquirer.is_finished());

    pool.close_all().await;

    // The freshly opened connection must not be lent on a closed manager
    let err = acquirer.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::ManagerClosed));

    let stats = pool.get_stats().await;
    assert_eq!(stats.total_connections, 0);
    assert_eq!(stats.active_connections, 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_all_wakes_blocked_acquirers() {
    let transport = Arc::new(MockTransport::new());
    let pool = pool_with(
        Arc::clone(&transport),
        PoolConfig::default()
            .with_max_connections_per_server(1)
            .with_acquire_timeout(Duration::from_secs(60)),
    );

    let _held = pool.get_connection("github").await.unwrap();

    let waiter_pool = Arc::clone(&pool);
    let waiter = tokio::spawn(async move { waiter_pool.get_connection("github").await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    pool.close_all().await;

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::ManagerClosed));
}
