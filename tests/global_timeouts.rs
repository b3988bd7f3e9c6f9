//! Global (all-zones) timeout scopes.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use zone_timeout::config::TimeoutConfig;
use zone_timeout::{ScopeKind, TimeoutReason, ZoneTimeoutError, ALL_ZONES};

mod common;

#[tokio::test(start_paused = true)]
async fn test_expires_at_deadline_not_at_work_end() {
    let (manager, _shutdown) = common::start_manager();
    let start = Instant::now();

    let result = manager
        .timeout(Duration::from_millis(100))
        .run(sleep(Duration::from_millis(300)))
        .await;

    assert_eq!(result, Err(ZoneTimeoutError::Expired { scope: ScopeKind::Global }));
    let elapsed = common::elapsed_ms(start);
    assert!((100..300).contains(&elapsed), "expired after {}ms", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_completes_within_deadline() {
    let (manager, _shutdown) = common::start_manager();

    let result = manager
        .timeout(Duration::from_millis(300))
        .run(async {
            sleep(Duration::from_millis(100)).await;
            42
        })
        .await;

    assert_eq!(result, Ok(42));
}

#[tokio::test(start_paused = true)]
async fn test_property_holds_across_durations() {
    let (manager, _shutdown) = common::start_manager();

    for deadline_ms in [20u64, 50, 150, 400] {
        let deadline = Duration::from_millis(deadline_ms);

        let short = manager.timeout(deadline).run(sleep(deadline / 2)).await;
        assert!(short.is_ok(), "{}ms deadline, half-length work", deadline_ms);

        let long = manager.timeout(deadline).run(sleep(deadline * 2)).await;
        assert_eq!(long.unwrap_err().reason(), TimeoutReason::Expired);
    }
}

#[tokio::test(start_paused = true)]
async fn test_all_zones_name_selects_global_scope() {
    let (manager, _shutdown) = common::start_manager();

    let scope = manager.async_timeout(Duration::from_secs(1), ALL_ZONES, None);
    assert_eq!(scope.kind(), &ScopeKind::Global);

    let scope = manager.async_timeout(Duration::from_secs(1), "recorder", None);
    assert_eq!(scope.kind(), &ScopeKind::Zone("recorder".into()));
}

#[tokio::test(start_paused = true)]
async fn test_outer_shorter_global_cancels_whole_nest() {
    let (manager, _shutdown) = common::start_manager();
    let start = Instant::now();

    let result = manager
        .timeout(Duration::from_millis(100))
        .run(async {
            manager
                .timeout(Duration::from_millis(500))
                .run(async {
                    manager
                        .zone_timeout(Duration::from_secs(1), "inner")
                        .run(sleep(Duration::from_secs(2)))
                        .await
                })
                .await
        })
        .await;

    assert_eq!(result, Err(ZoneTimeoutError::Expired { scope: ScopeKind::Global }));
    assert!(common::elapsed_ms(start) < 500);

    let snapshot = manager.snapshot().await.unwrap();
    assert!(snapshot.zones_done());
    assert_eq!(snapshot.global_tasks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_caught_inner_timeout_does_not_stop_outer_deadline() {
    let (manager, _shutdown) = common::start_manager();
    let start = Instant::now();

    let result = manager
        .timeout(Duration::from_millis(300))
        .run(async {
            let inner = manager
                .zone_timeout(Duration::from_millis(100), "inner")
                .run(sleep(Duration::from_secs(1)))
                .await;
            assert_eq!(inner.unwrap_err().scope(), &ScopeKind::Zone("inner".into()));

            sleep(Duration::from_secs(1)).await;
        })
        .await;

    assert!(result.is_err());
    let elapsed = common::elapsed_ms(start);
    assert!((300..1000).contains(&elapsed), "outer fired after {}ms", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_cool_down_lets_inner_zone_fire_first() {
    let (manager, _shutdown) = common::start_manager();
    let start = Instant::now();

    let result = manager
        .timeout(Duration::from_millis(100))
        .with_cool_down(Duration::from_millis(200))
        .run(async {
            manager
                .zone_timeout(Duration::from_millis(250), "inner")
                .run(sleep(Duration::from_secs(1)))
                .await
        })
        .await;

    let inner = result.expect("global deadline must wait for the inner zone");
    assert_eq!(
        inner,
        Err(ZoneTimeoutError::Expired {
            scope: ScopeKind::Zone("inner".into())
        })
    );
    let elapsed = common::elapsed_ms(start);
    assert!((250..300).contains(&elapsed), "inner fired after {}ms", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_cool_down_still_cancels_after_grace() {
    let (manager, _shutdown) = common::start_manager();
    let start = Instant::now();

    let result = manager
        .timeout(Duration::from_millis(100))
        .with_cool_down(Duration::from_millis(200))
        .run(async {
            let _ = manager
                .zone_timeout(Duration::from_secs(5), "slow")
                .run(sleep(Duration::from_secs(10)))
                .await;
        })
        .await;

    assert!(result.is_err());
    let elapsed = common::elapsed_ms(start);
    assert!((300..5000).contains(&elapsed), "cancelled after {}ms", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_no_cool_down_without_pending_work() {
    let (manager, _shutdown) = common::start_manager();
    let start = Instant::now();

    let result = manager
        .timeout(Duration::from_millis(100))
        .with_cool_down(Duration::from_secs(5))
        .run(sleep(Duration::from_secs(1)))
        .await;

    assert!(result.is_err());
    assert!(common::elapsed_ms(start) < 1000);
}

#[tokio::test(start_paused = true)]
async fn test_configured_default_cool_down() {
    let (manager, _shutdown) = common::start_manager_with(TimeoutConfig {
        default_cool_down_ms: 200,
        ..TimeoutConfig::default()
    });

    let result = manager
        .timeout(Duration::from_millis(100))
        .run(async {
            manager
                .zone_timeout(Duration::from_millis(150), "inner")
                .run(sleep(Duration::from_secs(1)))
                .await
        })
        .await;

    assert!(matches!(result, Ok(Err(ZoneTimeoutError::Expired { .. }))));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_durations_do_not_disturb_other_scopes() {
    let (manager, _shutdown) = common::start_manager();

    let bystander = manager
        .zone_timeout(Duration::from_secs(10), "hue")
        .run(sleep(Duration::from_secs(1)));
    let unbounded = manager
        .timeout(Duration::MAX)
        .with_cool_down(Duration::MAX)
        .run(sleep(Duration::from_millis(10)));
    let unbounded_zone = manager.zone_timeout(Duration::MAX, "forever").run(async {
        let freeze = manager.freeze(None).await;
        sleep(Duration::from_millis(10)).await;
        freeze.release().await;
    });
    let endless_cool_down = manager
        .async_timeout(Duration::from_millis(50), ALL_ZONES, Some(Duration::MAX))
        .run(sleep(Duration::from_millis(500)));

    let (bystander, unbounded, unbounded_zone, endless_cool_down) =
        tokio::join!(bystander, unbounded, unbounded_zone, endless_cool_down);
    assert_eq!(bystander, Ok(()));
    assert_eq!(unbounded, Ok(()));
    assert_eq!(unbounded_zone, Ok(()));
    assert_eq!(endless_cool_down, Ok(()));
    assert!(manager.is_running());
    assert!(manager.snapshot().await.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_offloaded_blocking_work_times_out() {
    let (manager, _shutdown) = common::start_manager();
    let start = Instant::now();

    let result = manager
        .timeout(Duration::from_millis(100))
        .run(tokio::task::spawn_blocking(|| common::blocking_work(Duration::from_millis(300))))
        .await;

    assert!(result.is_err());
    assert!(common::elapsed_ms(start) < 250);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_offloaded_blocking_work_completes() {
    let (manager, _shutdown) = common::start_manager();

    let result = manager
        .timeout(Duration::from_millis(500))
        .run(tokio::task::spawn_blocking(|| common::blocking_work(Duration::from_millis(50))))
        .await;

    assert!(matches!(result, Ok(Ok(()))));
}
