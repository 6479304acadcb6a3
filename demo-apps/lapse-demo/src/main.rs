use anyhow::{bail, ensure, Result};
use futures::future::join_all;
use lapse_core::{Store, StoreConfig, SweeperState, Ttl, NO_EXPIRATION};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SWEEP_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lapse_demo=info,lapse_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Lapse demo");
    tracing::info!("   Sweep interval: {:?}", SWEEP_INTERVAL);

    test_basic_operations()?;
    test_add_semantics().await?;
    test_parallel_set_get().await?;
    test_sweeper_lifecycle().await?;

    tracing::info!("All checks passed");
    Ok(())
}

/// SET/GET/DELETE with each TTL flavour
fn test_basic_operations() -> Result<()> {
    tracing::info!("Check: Basic operations");

    let store: Store<String> = Store::with_default_ttl(Duration::from_secs(60));
    let key = format!("basic-{}", uuid::Uuid::new_v4());

    store.set(key.clone(), "hello world".to_string(), Ttl::Default);
    ensure!(
        store.get(&key).as_deref() == Some("hello world"),
        "value should be readable right after set"
    );

    store.set("pinned", "forever".to_string(), NO_EXPIRATION);
    ensure!(
        matches!(store.get_with_expiration("pinned"), Some((_, None))),
        "NO_EXPIRATION entries carry no deadline"
    );

    ensure!(store.delete(&key), "key should be deleted");
    ensure!(store.get(&key).is_none(), "key should be gone after delete");

    tracing::info!("   basic operations work correctly");
    Ok(())
}

/// ADD rejects live keys and reclaims expired ones
async fn test_add_semantics() -> Result<()> {
    tracing::info!("Check: ADD semantics");

    let store: Store<u64> = Store::new();
    store.add("counter", 1, Ttl::millis(100))?;

    let Err(err) = store.add("counter", 2, Ttl::millis(100)) else {
        bail!("second add on a live key must fail");
    };
    ensure!(err.is_key_exists(), "unexpected error: {}", err);
    ensure!(store.get("counter") == Some(1), "first value must survive");

    tokio::time::sleep(Duration::from_millis(150)).await;
    ensure!(store.get("counter").is_none(), "entry should read as expired");

    store.add("counter", 2, NO_EXPIRATION)?;
    ensure!(store.get("counter") == Some(2), "expired key should be re-addable");

    tracing::info!("   {}", err);
    Ok(())
}

/// Many writers and readers on one store, no value mixing
async fn test_parallel_set_get() -> Result<()> {
    let num_operations = 500;
    tracing::info!("Check: Parallel SET/GET ({} tasks)", num_operations);

    let store: Store<String> = Store::new();
    let start = Instant::now();

    let test_data: Vec<(String, String)> = (0..num_operations)
        .map(|i| {
            let key = format!("parallel-{}-{}", i, uuid::Uuid::new_v4());
            let value = format!("value-{}-{}", i, uuid::Uuid::new_v4());
            (key, value)
        })
        .collect();

    let set_tasks: Vec<_> = test_data
        .iter()
        .cloned()
        .map(|(key, value)| {
            let store = store.clone();
            tokio::spawn(async move { store.set(key, value, Ttl::secs(300)) })
        })
        .collect();

    join_all(set_tasks)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let set_elapsed = start.elapsed();
    tracing::info!("   SET {} keys in {:?}", num_operations, set_elapsed);

    let errors = Arc::new(AtomicUsize::new(0));
    let get_tasks: Vec<_> = test_data
        .iter()
        .cloned()
        .map(|(key, expected_value)| {
            let store = store.clone();
            let errors = Arc::clone(&errors);
            tokio::spawn(async move {
                let value = store.get(&key);
                if value.as_deref() != Some(expected_value.as_str()) {
                    tracing::error!(
                        "Value mismatch for key {}: expected '{}', got '{:?}'",
                        key,
                        expected_value,
                        value
                    );
                    errors.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    join_all(get_tasks)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let error_count = errors.load(Ordering::SeqCst);
    ensure!(error_count == 0, "{} values did not match", error_count);
    ensure!(store.len() == num_operations, "every key should be stored");

    tracing::info!("   all {} values verified correctly", num_operations);
    Ok(())
}

/// Background sweep removes entries; after stop, expired entries linger
async fn test_sweeper_lifecycle() -> Result<()> {
    tracing::info!("Check: Sweeper lifecycle");

    let config = StoreConfig::from_env().with_sweep_interval(SWEEP_INTERVAL);
    let store: Store<String> = Store::with_config(config)?;
    ensure!(store.sweeper_state() == SweeperState::Running, "sweeper should be running");

    store.set("short", "value".to_string(), Ttl::millis(50));
    store.set("keep", "value".to_string(), NO_EXPIRATION);

    tokio::time::sleep(SWEEP_INTERVAL + Duration::from_millis(100)).await;
    ensure!(store.len() == 1, "sweeper should have removed the short entry");

    ensure!(store.stop_sweeper(), "first stop should stop the sweeper");
    ensure!(!store.stop_sweeper(), "second stop should be a no-op");

    store.set("short", "value".to_string(), Ttl::millis(50));
    tokio::time::sleep(SWEEP_INTERVAL * 2).await;

    ensure!(store.get("short").is_none(), "expired entry must read as absent");
    ensure!(store.len() == 2, "stopped sweeper must leave the entry in place");
    ensure!(store.delete_expired() == 1, "manual sweep still works");

    tracing::info!("   sweeper started, swept and stopped correctly");
    Ok(())
}
