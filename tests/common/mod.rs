//! Shared test infrastructure for the integration suite.

use std::sync::Once;

use tiered_cache::{CacheProvider, CacheProviderOptions};
use tracing_subscriber::EnvFilter;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber once per test binary so `cargo test -- --nocapture`
/// surfaces the engine's own `debug!`/`info!`/`warn!` call sites during diagnosis.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_test_writer()
            .try_init();
    });
}

/// Host/port for the Redis instance the integration suite expects, taken
/// from the environment the way the teacher's own `tests/common` does.
pub fn redis_host() -> String {
    std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

pub fn redis_port() -> u16 {
    std::env::var("REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6379)
}

/// A unique per-test instance name, so concurrently-run tests sharing one
/// Redis don't collide on the same namespace.
pub fn unique_instance_name(label: &str) -> String {
    format!("it-{label}-{}", rand::random::<u32>())
}

/// Build a provider wired to the test Redis instance.
pub async fn remote_provider(label: &str) -> anyhow::Result<CacheProvider> {
    init_tracing();
    let opts = CacheProviderOptions::new(unique_instance_name(label)).with_single(redis_host(), redis_port());
    Ok(CacheProvider::new(opts).await?)
}

/// Build a provider with no remote tier at all.
pub async fn local_only_provider(label: &str) -> anyhow::Result<CacheProvider> {
    init_tracing();
    let opts = CacheProviderOptions::new(unique_instance_name(label));
    Ok(CacheProvider::new(opts).await?)
}

/// Poll `condition` until it's true or `timeout_ms` elapses.
pub async fn wait_for<F>(mut condition: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    use tokio::time::{sleep, Duration};

    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}
