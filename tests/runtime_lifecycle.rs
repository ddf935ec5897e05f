//! Global runtime lifecycle. Kept in its own binary, as a single test, so
//! init/shutdown cycles never race another test's shared runtime.

use strand_rs::prelude::*;
use std::time::Duration;

#[test]
fn test_runtime_lifecycle() {
    // explicit construction is strict
    strand_rs::init().unwrap();
    assert!(matches!(
        strand_rs::init(),
        Err(strand_rs::Error::AlreadyInitialized)
    ));

    // the bootstrap is idempotent next to an existing runtime
    enable_runtime().unwrap();
    enable_runtime().unwrap();

    let task = spawn(async {
        sleep_for(Duration::from_millis(2)).await;
        1
    });
    assert_eq!(sync_wait(task), 1);

    let stats = runtime_stats().expect("runtime is up");
    assert!(stats.worker_threads >= 1);
    assert!(stats.drive_ticks > 0);

    shutdown();
    assert!(runtime_stats().is_none());

    // best-effort teardown supports explicit re-construction
    let config = strand_rs::Config::builder()
        .num_threads(2)
        .tick_interval(Duration::from_micros(200))
        .thread_name_prefix("lifecycle")
        .build()
        .unwrap();
    strand_rs::init_with_config(config).unwrap();

    let stats = runtime_stats().expect("runtime is up");
    assert_eq!(stats.worker_threads, 2);

    let task = spawn(async {
        sleep_for(Duration::from_millis(2)).await;
        9
    });
    assert_eq!(sync_wait(task), 9);
    shutdown();
}
