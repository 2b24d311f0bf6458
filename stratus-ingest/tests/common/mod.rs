//! Shared test fixtures: synthetic product files and a scripted provider
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stratus_core::wsr88d::{scan_time, NexradFile, NexradFileFactory};
use stratus_ingest::provider::DataProvider;
use stratus_ingest::{IngestError, ProviderFactory};

/// Modified Julian date used by all fixtures (day 1 = 1970-01-01)
pub const TEST_DATE: u16 = 20_454;

/// Fixture product time for the given milliseconds of day
pub fn product_time(milliseconds_of_day: u32) -> DateTime<Utc> {
    scan_time(u32::from(TEST_DATE), milliseconds_of_day)
}

/// A minimal Level-III product file for KLSX
pub fn level3_product_bytes(product: &str, time_seconds: u32) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(b"SDUS53 KLSX 010000\r\r\n");
    raw.extend_from_slice(format!("{product}LSX\r\r\n").as_bytes());
    raw.extend_from_slice(&94i16.to_be_bytes());
    raw.extend_from_slice(&TEST_DATE.to_be_bytes());
    raw.extend_from_slice(&time_seconds.to_be_bytes());
    raw.extend_from_slice(&64u32.to_be_bytes());
    raw.extend_from_slice(&1i16.to_be_bytes());
    raw.extend_from_slice(&0i16.to_be_bytes());
    raw.extend_from_slice(&3u16.to_be_bytes());
    raw.extend_from_slice(&[0u8; 46]);
    raw
}

fn message31_record(elevation_number: u8, collection_time: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"KLSX");
    body.extend_from_slice(&collection_time.to_be_bytes());
    body.extend_from_slice(&TEST_DATE.to_be_bytes());
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&90.5f32.to_bits().to_be_bytes());
    body.push(0); // compression indicator
    body.push(0); // reserved
    body.extend_from_slice(&0u16.to_be_bytes()); // radial length
    body.push(1); // azimuth resolution spacing
    body.push(0); // radial status
    body.push(elevation_number);
    body.push(0); // cut sector number
    body.extend_from_slice(&0.5f32.to_bits().to_be_bytes());
    body.push(0); // spot blanking
    body.push(0); // azimuth indexing mode
    body.extend_from_slice(&4u16.to_be_bytes()); // data block count

    let vol = {
        let mut b = Vec::new();
        b.extend_from_slice(b"RVOL");
        b.extend_from_slice(&44u16.to_be_bytes());
        b.push(1);
        b.push(0);
        b.extend_from_slice(&38.699f32.to_bits().to_be_bytes());
        b.extend_from_slice(&(-90.683f32).to_bits().to_be_bytes());
        b.extend_from_slice(&185u16.to_be_bytes());
        b.extend_from_slice(&10u16.to_be_bytes());
        for _ in 0..5 {
            b.extend_from_slice(&0f32.to_bits().to_be_bytes());
        }
        b.extend_from_slice(&212u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b
    };
    let elv = {
        let mut b = Vec::new();
        b.extend_from_slice(b"RELV");
        b.extend_from_slice(&12u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&0f32.to_bits().to_be_bytes());
        b
    };
    let rad = {
        let mut b = Vec::new();
        b.extend_from_slice(b"RRAD");
        b.extend_from_slice(&28u16.to_be_bytes());
        b.extend_from_slice(&466u16.to_be_bytes());
        b.extend_from_slice(&0f32.to_bits().to_be_bytes());
        b.extend_from_slice(&0f32.to_bits().to_be_bytes());
        b.extend_from_slice(&2634u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&0f32.to_bits().to_be_bytes());
        b.extend_from_slice(&0f32.to_bits().to_be_bytes());
        b
    };
    let refl = {
        let mut b = Vec::new();
        b.extend_from_slice(b"DREF");
        b.extend_from_slice(&0u32.to_be_bytes());
        b.extend_from_slice(&8u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&250u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&16u16.to_be_bytes());
        b.push(0);
        b.push(8);
        b.extend_from_slice(&2f32.to_bits().to_be_bytes());
        b.extend_from_slice(&66f32.to_bits().to_be_bytes());
        b.extend_from_slice(&[10, 20, 30, 40, 50, 60, 70, 80]);
        b
    };

    let blocks = [vol, elv, rad, refl];
    let mut offset = (body.len() + blocks.len() * 4) as u32;
    for block in &blocks {
        body.extend_from_slice(&offset.to_be_bytes());
        offset += block.len() as u32;
    }
    for block in &blocks {
        body.extend_from_slice(block);
    }
    if body.len() % 2 != 0 {
        body.push(0);
    }

    let mut record = vec![0u8; 12]; // CTM pad
    record.extend_from_slice(&(((body.len() + 16) / 2) as u16).to_be_bytes());
    record.push(0);
    record.push(31);
    record.extend_from_slice(&1u16.to_be_bytes());
    record.extend_from_slice(&TEST_DATE.to_be_bytes());
    record.extend_from_slice(&collection_time.to_be_bytes());
    record.extend_from_slice(&1u16.to_be_bytes());
    record.extend_from_slice(&1u16.to_be_bytes());
    record.extend_from_slice(&body);
    record
}

/// A minimal Level-II archive volume for KLSX with one radial
pub fn level2_volume_bytes(collection_time_ms: u32) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(b"AR2V0006.001");
    raw.extend_from_slice(&u32::from(TEST_DATE).to_be_bytes());
    raw.extend_from_slice(&collection_time_ms.to_be_bytes());
    raw.extend_from_slice(b"KLSX");
    raw.extend_from_slice(&message31_record(1, collection_time_ms));
    raw
}

/// A scripted data provider backed by an in-memory object listing
pub struct MockProvider {
    objects: BTreeMap<DateTime<Utc>, (String, Vec<u8>)>,
    refresh_results: Mutex<Vec<(usize, usize)>>,
    pub refresh_calls: AtomicUsize,
    pub load_calls: AtomicUsize,
    pub available_requests: AtomicUsize,
    load_delay: Duration,
    update_period: Duration,
    available: Vec<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        MockProvider {
            objects: BTreeMap::new(),
            refresh_results: Mutex::new(Vec::new()),
            refresh_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            available_requests: AtomicUsize::new(0),
            load_delay: Duration::from_millis(25),
            update_period: Duration::from_secs(300),
            available: Vec::new(),
        }
    }

    pub fn with_object(mut self, time: DateTime<Utc>, key: &str, bytes: Vec<u8>) -> Self {
        self.objects.insert(time, (key.to_string(), bytes));
        self
    }

    /// Queue refresh results, consumed in order; the last one repeats
    pub fn with_refresh_results(self, results: &[(usize, usize)]) -> Self {
        *self.refresh_results.lock().unwrap() = results.to_vec();
        self
    }

    pub fn with_available(mut self, products: &[&str]) -> Self {
        self.available = products.iter().map(|p| p.to_string()).collect();
        self
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    async fn refresh(&self) -> Result<(usize, usize), IngestError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let mut results = self.refresh_results.lock().unwrap();
        match results.len() {
            0 => Ok((0, self.objects.len())),
            1 => Ok(results[0]),
            _ => Ok(results.remove(0)),
        }
    }

    async fn find_latest_key(&self) -> Option<String> {
        self.objects
            .last_key_value()
            .map(|(_, (key, _))| key.clone())
    }

    async fn find_key(&self, time: DateTime<Utc>) -> Option<String> {
        self.objects
            .range(..=time)
            .next_back()
            .map(|(_, (key, _))| key.clone())
    }

    async fn time_point_by_key(&self, key: &str) -> Option<DateTime<Utc>> {
        self.objects
            .iter()
            .find(|(_, (k, _))| k == key)
            .map(|(time, _)| *time)
    }

    async fn load_object_by_key(&self, key: &str) -> Result<NexradFile, IngestError> {
        tokio::time::sleep(self.load_delay).await;
        self.load_calls.fetch_add(1, Ordering::SeqCst);

        let bytes = self
            .objects
            .values()
            .find(|(k, _)| k == key)
            .map(|(_, bytes)| bytes.clone())
            .ok_or(IngestError::NotFound)?;

        let mut cursor = std::io::Cursor::new(bytes);
        NexradFileFactory::create(&mut cursor).map_err(IngestError::from)
    }

    fn update_period(&self) -> Duration {
        self.update_period
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.objects.last_key_value().map(|(time, _)| *time)
    }

    async fn request_available_products(&self) {
        self.available_requests.fetch_add(1, Ordering::SeqCst);
    }

    async fn available_products(&self) -> Vec<String> {
        self.available.clone()
    }
}

/// Provider factory handing out preconstructed mocks
pub struct MockProviderFactory {
    pub level2: Arc<MockProvider>,
    pub level3: Arc<MockProvider>,
}

impl ProviderFactory for MockProviderFactory {
    fn create_level2_provider(&self, _radar_id: &str) -> Arc<dyn DataProvider> {
        Arc::clone(&self.level2) as Arc<dyn DataProvider>
    }

    fn create_level3_provider(&self, _radar_id: &str, _product: &str) -> Arc<dyn DataProvider> {
        Arc::clone(&self.level3) as Arc<dyn DataProvider>
    }
}
