//! Scenario 3 from `SPEC_FULL.md` §8: an instance registered for sync on a
//! key converges its local tier after another writer changes the key
//! remotely.

mod common;

use tiered_cache::{CacheProviderOptions, GetOptions, Lookup, Primitive, SetOptions, TierLevel};
use tokio::time::{sleep, Duration};

#[tokio::test]
async fn local_tier_converges_after_external_remote_write() {
    let instance_name = common::unique_instance_name("sync");
    let opts = CacheProviderOptions::new(instance_name.clone())
        .with_single(common::redis_host(), common::redis_port());
    let provider = tiered_cache::CacheProvider::new(opts).await.unwrap();

    provider
        .set_primitive(
            "S",
            Primitive::String("v1".to_string()),
            SetOptions { level: Some(TierLevel::BOTH), ..Default::default() },
        )
        .await
        .unwrap();

    // A second provider sharing the same Redis simulates an external
    // writer updating `{instance}::S` directly on the remote tier.
    let writer = common::remote_provider("sync-writer").await.unwrap();
    let storage_key = format!("{instance_name}::S");
    writer
        .set_primitive(
            &storage_key,
            Primitive::String("v2".to_string()),
            SetOptions { level: Some(TierLevel::REMOTE), is_global: true, ..Default::default() },
        )
        .await
        .unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    let mut converged = false;
    while std::time::Instant::now() < deadline {
        let local = provider
            .get_primitive("S", GetOptions { force_remote: false, parse_type: true, ..Default::default() })
            .await
            .unwrap();
        if local == Lookup::Present(Primitive::String("v2".to_string())) {
            converged = true;
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert!(converged, "local tier did not converge to the externally-written value");

    provider.dispose().await;
    writer.dispose().await;
}
