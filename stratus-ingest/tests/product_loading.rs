//! Product loading, caching, and discovery against a scripted provider

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    level2_volume_bytes, level3_product_bytes, product_time, MockProvider, MockProviderFactory,
};
use stratus_core::wsr88d::DataBlockType;
use stratus_core::RadarProductGroup;
use stratus_ingest::event::Event;
use stratus_ingest::products::Level3ProductCategory;
use stratus_ingest::{IngestContext, NexradFileRequest};
use tokio::time::timeout;

fn context_with(
    level2: MockProvider,
    level3: MockProvider,
) -> (Arc<IngestContext>, Arc<MockProvider>, Arc<MockProvider>) {
    let level2 = Arc::new(level2);
    let level3 = Arc::new(level3);

    let context = IngestContext::new(Box::new(MockProviderFactory {
        level2: Arc::clone(&level2),
        level3: Arc::clone(&level3),
    }));

    (context, level2, level3)
}

async fn wait_complete(request: &NexradFileRequest) {
    timeout(Duration::from_secs(30), request.wait())
        .await
        .expect("request did not complete in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_level2_loads_share_one_fetch() {
    let time = product_time(43_200_000);
    let (context, level2, _) = context_with(
        MockProvider::new().with_object(time, "vol1", level2_volume_bytes(43_200_000)),
        MockProvider::new(),
    );

    let manager = context.instance("KLSX");

    let first = NexradFileRequest::new();
    let second = NexradFileRequest::new();
    manager.load_level2(time, Some(Arc::clone(&first)));
    manager.load_level2(time, Some(Arc::clone(&second)));

    wait_complete(&first).await;
    wait_complete(&second).await;

    assert_eq!(level2.load_calls.load(Ordering::SeqCst), 1);

    let first_record = first.radar_product_record().expect("first load failed");
    let second_record = second.radar_product_record().expect("second load failed");
    assert!(Arc::ptr_eq(&first_record, &second_record));
    assert_eq!(first_record.radar_id(), "KLSX");
    assert_eq!(
        first_record.radar_product_group(),
        RadarProductGroup::Level2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_level2_load_observes_cached_record() {
    let time = product_time(43_200_000);
    let (context, level2, _) = context_with(
        MockProvider::new().with_object(time, "vol1", level2_volume_bytes(43_200_000)),
        MockProvider::new(),
    );

    let manager = context.instance("KLSX");

    let first = NexradFileRequest::new();
    manager.load_level2(time, Some(Arc::clone(&first)));
    wait_complete(&first).await;

    let second = NexradFileRequest::new();
    manager.load_level2(time, Some(Arc::clone(&second)));
    wait_complete(&second).await;

    // The decoder ran once; the second call observed the cache
    assert_eq!(level2.load_calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(
        &first.radar_product_record().unwrap(),
        &second.radar_product_record().unwrap()
    ));

    // The record is queryable through the elevation scan path
    let (scan, cut, cuts) = manager
        .get_level2(DataBlockType::MomentRef, 0.5, Some(time))
        .expect("no elevation scan");
    assert_eq!(scan.elevation_number, 1);
    assert!((cut - 0.5).abs() < 1e-6);
    assert_eq!(cuts.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn load_without_matching_key_completes_empty() {
    let (context, _, _) = context_with(MockProvider::new(), MockProvider::new());
    let manager = context.instance("KLSX");

    let request = NexradFileRequest::new();
    manager.load_level2(product_time(43_200_000), Some(Arc::clone(&request)));
    wait_complete(&request).await;

    assert!(request.radar_product_record().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn level3_load_and_query() {
    let time = product_time(43_200_000);
    let (context, _, level3) = context_with(
        MockProvider::new(),
        MockProvider::new()
            .with_object(time, "n0b-1", level3_product_bytes("N0B", 43_200))
            .with_available(&["N0B"]),
    );

    let manager = context.instance("KLSX");

    // Creates the provider manager for the product without enabling refresh
    manager.enable_refresh(RadarProductGroup::Level3, "N0B", false);

    let request = NexradFileRequest::new();
    manager.load_level3("N0B", time, Some(Arc::clone(&request)));
    wait_complete(&request).await;

    let record = request.radar_product_record().expect("level 3 load failed");
    assert_eq!(record.radar_product(), "N0B");
    assert_eq!(level3.load_calls.load(Ordering::SeqCst), 1);

    let message = manager.get_level3("N0B", Some(time)).expect("no message");
    assert_eq!(message.header.message_code, 94);

    // Latest-record query
    assert!(manager.get_level3("N0B", None).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn level3_load_without_provider_manager_completes_empty() {
    let (context, _, _) = context_with(MockProvider::new(), MockProvider::new());
    let manager = context.instance("KLSX");

    let request = NexradFileRequest::new();
    manager.load_level3("N0B", product_time(43_200_000), Some(Arc::clone(&request)));
    wait_complete(&request).await;

    assert!(request.radar_product_record().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn load_file_consults_the_file_index() {
    let (context, _, _) = context_with(MockProvider::new(), MockProvider::new());
    let manager = context.instance("KLSX");

    let path = std::env::temp_dir().join("stratus-test-KLSX-N0B.nids");
    std::fs::write(&path, level3_product_bytes("N0B", 43_200)).unwrap();
    let filename = path.to_string_lossy().to_string();

    let first = NexradFileRequest::new();
    manager.load_file(&filename, Some(Arc::clone(&first)));
    wait_complete(&first).await;

    let second = NexradFileRequest::new();
    manager.load_file(&filename, Some(Arc::clone(&second)));
    wait_complete(&second).await;

    let first_record = first.radar_product_record().expect("file load failed");
    let second_record = second.radar_product_record().expect("indexed load failed");
    assert!(Arc::ptr_eq(&first_record, &second_record));

    context.cleanup();
    let _ = std::fs::remove_file(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registry_reuses_live_instances() {
    let (context, _, _) = context_with(MockProvider::new(), MockProvider::new());
    let mut events = context.subscribe();

    let first = context.instance("KLSX");
    let second = context.instance("KLSX");
    assert!(Arc::ptr_eq(&first, &second));

    assert!(matches!(
        events.try_recv(),
        Ok(Event::RadarProductManagerCreated { .. })
    ));
    assert!(events.try_recv().is_err());

    // Once every strong reference is gone, the registry constructs anew
    drop(first);
    drop(second);
    let _third = context.instance("KLSX");
    assert!(matches!(
        events.try_recv(),
        Ok(Event::RadarProductManagerCreated { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn update_available_products_buckets_and_notifies() {
    let (context, _, level3) = context_with(
        MockProvider::new(),
        MockProvider::new().with_available(&["N0B", "N0G"]),
    );

    let manager = context.instance("KLSX");
    let mut events = context.subscribe();

    manager.update_available_products();

    loop {
        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no products-changed event")
            .expect("event channel closed");
        if matches!(event, Event::Level3ProductsChanged { .. }) {
            break;
        }
    }

    let categories = manager.get_available_level3_categories();
    assert!(categories.contains_key(&Level3ProductCategory::Reflectivity));
    assert!(categories.contains_key(&Level3ProductCategory::Velocity));
    assert!(!categories.contains_key(&Level3ProductCategory::Precipitation));

    assert_eq!(level3.available_requests.load(Ordering::SeqCst), 1);

    // Discovery is single-flight
    manager.update_available_products();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(level3.available_requests.load(Ordering::SeqCst), 1);

    assert_eq!(
        manager.get_level3_products().await,
        vec!["N0B".to_string(), "N0G".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn level3_refresh_gated_on_available_products() {
    let (context, _, level3) = context_with(
        MockProvider::new(),
        MockProvider::new().with_available(&["N0B"]),
    );

    let manager = context.instance("KLSX");

    // Unavailable product: refresh never starts
    manager.enable_refresh(RadarProductGroup::Level3, "XYZ", true);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(level3.refresh_calls.load(Ordering::SeqCst), 0);

    // Available product: refresh runs
    manager.enable_refresh(RadarProductGroup::Level3, "N0B", true);
    timeout(Duration::from_secs(5), async {
        while level3.refresh_calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("refresh never ran");
}
