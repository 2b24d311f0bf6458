//! Per-site radar product manager
//!
//! A `RadarProductManager` aggregates everything one radar site needs: the
//! Level-II provider manager, lazily created Level-III provider managers per
//! product, time-ordered record caches, precomputed coordinate grids, and
//! the Level-III product discovery state.
//!
//! Decodes for a given product group are serialized by a per-group mutex to
//! bound decoder memory use; record caches are guarded by reader-writer
//! locks and deduplicate by seconds-truncated record time.

use std::collections::HashMap;
use std::future::Future;
use std::io::{Read, Seek};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};

use chrono::{DateTime, Utc};
use stratus_core::wsr88d::{
    DataBlockType, ElevationScan, Level3Message, NexradFile, NexradFileFactory,
};
use stratus_core::{RadarProductGroup, RadialSize};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::RadarSite;
use crate::context::IngestContext;
use crate::coordinates::compute_coordinates;
use crate::error::IngestError;
use crate::event::Event;
use crate::products::{build_category_map, Level3CategoryMap, DEFAULT_LEVEL3_PRODUCT};
use crate::provider_manager::ProviderManager;
use crate::record::{RadarProductRecord, RadarProductRecordMap};
use crate::request::NexradFileRequest;

/// Which record cache a provider load goes through
enum RecordCache {
    Level2,
    Level3(String),
}

pub struct RadarProductManager {
    context: Arc<IngestContext>,
    radar_id: String,
    radar_site: Arc<RadarSite>,

    initialized: AtomicBool,
    initialize_mutex: Mutex<()>,
    coordinates_half: OnceLock<Arc<Vec<f32>>>,
    coordinates_full: OnceLock<Arc<Vec<f32>>>,

    level2_records: RwLock<RadarProductRecordMap>,
    level3_records: RwLock<HashMap<String, RadarProductRecordMap>>,

    level2_provider_manager: Arc<ProviderManager>,
    level3_provider_managers: RwLock<HashMap<String, Arc<ProviderManager>>>,

    load_level2_mutex: Arc<AsyncMutex<()>>,
    load_level3_mutex: Arc<AsyncMutex<()>>,

    level3_products_initialized: Mutex<bool>,
    available_categories: RwLock<Level3CategoryMap>,

    weak_self: Weak<RadarProductManager>,
}

impl RadarProductManager {
    pub(crate) fn new(context: Arc<IngestContext>, radar_id: &str) -> Arc<Self> {
        let radar_site = RadarSite::get(radar_id).unwrap_or_else(|| {
            log::warn!("Radar site not found: {:?}", radar_id);
            Arc::new(RadarSite::unknown(radar_id))
        });

        let level2_provider_manager = ProviderManager::new(
            radar_id,
            RadarProductGroup::Level2,
            "",
            context.provider_factory().create_level2_provider(radar_id),
            context.events().clone(),
        );

        Arc::new_cyclic(|weak_self| RadarProductManager {
            radar_id: radar_id.to_string(),
            radar_site,
            initialized: AtomicBool::new(false),
            initialize_mutex: Mutex::new(()),
            coordinates_half: OnceLock::new(),
            coordinates_full: OnceLock::new(),
            level2_records: RwLock::new(RadarProductRecordMap::new()),
            level3_records: RwLock::new(HashMap::new()),
            level2_provider_manager,
            level3_provider_managers: RwLock::new(HashMap::new()),
            load_level2_mutex: Arc::new(AsyncMutex::new(())),
            load_level3_mutex: Arc::new(AsyncMutex::new(())),
            level3_products_initialized: Mutex::new(false),
            available_categories: RwLock::new(Level3CategoryMap::new()),
            context,
            weak_self: weak_self.clone(),
        })
    }

    pub fn radar_id(&self) -> &str {
        &self.radar_id
    }

    pub fn radar_site(&self) -> Arc<RadarSite> {
        Arc::clone(&self.radar_site)
    }

    pub fn gate_size(&self) -> f64 {
        self.radar_site.gate_size_m()
    }

    /// Compute the coordinate grids once. Idempotent; later calls return
    /// immediately.
    pub fn initialize(&self) {
        let _guard = self.initialize_mutex.lock().unwrap();

        if self.initialized.load(Ordering::Acquire) {
            return;
        }

        log::debug!("Initialize: {}", self.radar_id);

        let started = std::time::Instant::now();
        let half = compute_coordinates(&self.radar_site, RadialSize::Half);
        let _ = self.coordinates_half.set(Arc::new(half));
        log::debug!(
            "Coordinates (0.5 degree) calculated in {:?}",
            started.elapsed()
        );

        let started = std::time::Instant::now();
        let full = compute_coordinates(&self.radar_site, RadialSize::Full);
        let _ = self.coordinates_full.set(Arc::new(full));
        log::debug!(
            "Coordinates (1 degree) calculated in {:?}",
            started.elapsed()
        );

        self.initialized.store(true, Ordering::Release);
    }

    /// Coordinate grid for one azimuth resolution; requires `initialize`
    pub fn coordinates(&self, radial_size: RadialSize) -> Result<Arc<Vec<f32>>, IngestError> {
        let cell = match radial_size {
            RadialSize::Half => &self.coordinates_half,
            RadialSize::Full => &self.coordinates_full,
        };

        cell.get().cloned().ok_or_else(|| {
            IngestError::InvalidArgument("coordinates requested before initialization".into())
        })
    }

    // =========================================================================
    // Refresh control
    // =========================================================================

    /// Enable or disable periodic refresh for a product group. Level-III
    /// refresh is gated on the product being present in the provider's
    /// available-product listing.
    pub fn enable_refresh(&self, group: RadarProductGroup, product: &str, enabled: bool) {
        match group {
            RadarProductGroup::Level2 => {
                self.level2_provider_manager.set_refresh_enabled(enabled);
            }
            RadarProductGroup::Level3 => {
                let provider_manager = self.get_level3_provider_manager(product);
                let product = product.to_string();

                tokio::spawn(async move {
                    provider_manager.provider().request_available_products().await;
                    let available = provider_manager.provider().available_products().await;

                    if available.iter().any(|p| p == &product) {
                        provider_manager.set_refresh_enabled(enabled);
                    }
                });
            }
        }
    }

    pub(crate) fn get_level3_provider_manager(&self, product: &str) -> Arc<ProviderManager> {
        {
            let managers = self.level3_provider_managers.read().unwrap();
            if let Some(manager) = managers.get(product) {
                return Arc::clone(manager);
            }
        }

        let mut managers = self.level3_provider_managers.write().unwrap();
        Arc::clone(managers.entry(product.to_string()).or_insert_with(|| {
            ProviderManager::new(
                &self.radar_id,
                RadarProductGroup::Level3,
                product,
                self.context
                    .provider_factory()
                    .create_level3_provider(&self.radar_id, product),
                self.context.events().clone(),
            )
        }))
    }

    // =========================================================================
    // Loading
    // =========================================================================

    pub fn load_level2(&self, time: DateTime<Utc>, request: Option<Arc<NexradFileRequest>>) {
        log::debug!("LoadLevel2Data: {}", time);

        self.load_provider_data(
            time,
            Arc::clone(&self.level2_provider_manager),
            RecordCache::Level2,
            Arc::clone(&self.load_level2_mutex),
            request,
        );
    }

    pub fn load_level3(
        &self,
        product: &str,
        time: DateTime<Utc>,
        request: Option<Arc<NexradFileRequest>>,
    ) {
        log::debug!("LoadLevel3Data: {}, {}", product, time);

        let provider_manager = {
            let managers = self.level3_provider_managers.read().unwrap();
            managers.get(product).cloned()
        };

        let Some(provider_manager) = provider_manager else {
            log::debug!("No level 3 provider manager for product: {}", product);
            self.complete_request(request, None);
            return;
        };

        self.load_provider_data(
            time,
            provider_manager,
            RecordCache::Level3(product.to_string()),
            Arc::clone(&self.load_level3_mutex),
            request,
        );
    }

    /// Decode an arbitrary stream
    pub fn load_data<R: Read + Seek + Send + 'static>(
        &self,
        mut stream: R,
        request: Option<Arc<NexradFileRequest>>,
    ) {
        log::debug!("LoadData()");

        let load = async move {
            tokio::task::spawn_blocking(move || NexradFileFactory::create(&mut stream))
                .await
                .map_err(|e| IngestError::Provider(format!("decode task failed: {e}")))?
                .map(Arc::new)
                .map_err(IngestError::from)
        };

        spawn_load(
            Arc::clone(&self.context),
            self.context.file_load_mutex(),
            load,
            request,
            None,
        );
    }

    /// Decode a file from disk, consulting the process-wide file index first
    pub fn load_file(&self, filename: &str, request: Option<Arc<NexradFileRequest>>) {
        log::debug!("LoadFile: {}", filename);

        if let Some(existing) = self.context.indexed_file(filename) {
            log::debug!("File previously loaded, loading from file cache");
            self.complete_request(request, Some(existing));
            return;
        }

        let path = filename.to_string();
        let load = async move {
            tokio::task::spawn_blocking(move || NexradFileFactory::create_from_path(&path))
                .await
                .map_err(|e| IngestError::Provider(format!("decode task failed: {e}")))?
                .map(Arc::new)
                .map_err(IngestError::from)
        };

        spawn_load(
            Arc::clone(&self.context),
            self.context.file_load_mutex(),
            load,
            request,
            Some(filename.to_string()),
        );
    }

    fn load_provider_data(
        &self,
        time: DateTime<Utc>,
        provider_manager: Arc<ProviderManager>,
        cache: RecordCache,
        load_mutex: Arc<AsyncMutex<()>>,
        request: Option<Arc<NexradFileRequest>>,
    ) {
        log::debug!("LoadProviderData: {}, {}", provider_manager.name(), time);

        let Some(this) = self.weak_self.upgrade() else {
            self.complete_request(request, None);
            return;
        };
        let load = async move {
            if let Some(existing) = this.cached_file(&cache, time) {
                log::debug!("Data previously loaded, loading from data cache");
                return Ok(existing);
            }

            let key = provider_manager
                .provider()
                .find_key(time)
                .await
                .ok_or(IngestError::NotFound)?;

            provider_manager
                .provider()
                .load_object_by_key(&key)
                .await
                .map(Arc::new)
        };

        spawn_load(
            Arc::clone(&self.context),
            load_mutex,
            load,
            request,
            None,
        );
    }

    fn cached_file(&self, cache: &RecordCache, time: DateTime<Utc>) -> Option<Arc<NexradFile>> {
        match cache {
            RecordCache::Level2 => self
                .level2_records
                .read()
                .unwrap()
                .get_exact(time)
                .map(|record| record.nexrad_file()),
            RecordCache::Level3(product) => self
                .level3_records
                .read()
                .unwrap()
                .get(product)
                .and_then(|records| records.get_exact(time))
                .map(|record| record.nexrad_file()),
        }
    }

    fn complete_request(
        &self,
        request: Option<Arc<NexradFileRequest>>,
        record: Option<Arc<RadarProductRecord>>,
    ) {
        if let Some(request) = request {
            request.set_record(record);
            request.complete();
            self.context.publish(Event::RequestComplete { request });
        }
    }

    /// Store a record, deduplicating by seconds-truncated time. Returns the
    /// stored record, which is the existing one on a duplicate insert.
    pub(crate) fn store_record(&self, record: Arc<RadarProductRecord>) -> Arc<RadarProductRecord> {
        match record.radar_product_group() {
            RadarProductGroup::Level2 => self.level2_records.write().unwrap().store(record),
            RadarProductGroup::Level3 => self
                .level3_records
                .write()
                .unwrap()
                .entry(record.radar_product().to_string())
                .or_default()
                .store(record),
        }
    }

    // =========================================================================
    // Cache queries
    // =========================================================================

    fn get_level2_record(&self, time: Option<DateTime<Utc>>) -> Option<Arc<RadarProductRecord>> {
        let records = self.level2_records.read().unwrap();

        match time {
            None => records.latest(),
            Some(time) => {
                let record = records.get_bounded(time)?;

                // The bounded record may begin after the requested time in
                // the sub-second window its key truncated away
                if record
                    .level2_file()
                    .is_some_and(|file| file.start_time() > time)
                {
                    return None;
                }

                Some(record)
            }
        }
    }

    fn get_level3_record(
        &self,
        product: &str,
        time: Option<DateTime<Utc>>,
    ) -> Option<Arc<RadarProductRecord>> {
        let records = self.level3_records.read().unwrap();
        let product_records = records.get(product)?;

        match time {
            None => product_records.latest(),
            Some(time) => product_records.get_bounded(time),
        }
    }

    /// Elevation scan for a moment block near the requested elevation, from
    /// the cached record bounding `time` (`None` selects the latest record)
    pub fn get_level2(
        &self,
        data_block_type: DataBlockType,
        elevation: f32,
        time: Option<DateTime<Utc>>,
    ) -> Option<(Arc<ElevationScan>, f32, Vec<f32>)> {
        let record = self.get_level2_record(time)?;
        let file = record.level2_file()?;
        file.get_elevation_scan(data_block_type, elevation, time.unwrap_or_default())
    }

    /// Level-III message from the cached record bounding `time`
    pub fn get_level3(
        &self,
        product: &str,
        time: Option<DateTime<Utc>>,
    ) -> Option<Arc<Level3Message>> {
        let record = self.get_level3_record(product, time)?;
        record.level3_file().map(|file| file.message())
    }

    // =========================================================================
    // Level-III discovery
    // =========================================================================

    /// Request the provider's available-product listing once and bucket it
    /// into categories. Publishes `Level3ProductsChanged` on completion.
    pub fn update_available_products(&self) {
        {
            let mut initialized = self.level3_products_initialized.lock().unwrap();
            if *initialized {
                return;
            }
            // Not complete yet, but only ever initiated once; the event
            // fires on completion
            *initialized = true;
        }

        log::debug!("UpdateAvailableProducts: {}", self.radar_id);

        let Some(this) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let provider_manager = this.get_level3_provider_manager(DEFAULT_LEVEL3_PRODUCT);

            provider_manager.provider().request_available_products().await;
            let codes = provider_manager.provider().available_products().await;

            *this.available_categories.write().unwrap() = build_category_map(&codes);

            this.context.publish(Event::Level3ProductsChanged {
                radar_id: this.radar_id.clone(),
            });
        });
    }

    pub fn get_available_level3_categories(&self) -> Level3CategoryMap {
        self.available_categories.read().unwrap().clone()
    }

    /// Product codes currently visible in the Level-III provider listing
    pub async fn get_level3_products(&self) -> Vec<String> {
        let provider_manager = self.get_level3_provider_manager(DEFAULT_LEVEL3_PRODUCT);
        provider_manager.provider().available_products().await
    }
}

impl Drop for RadarProductManager {
    fn drop(&mut self) {
        self.level2_provider_manager.disable();

        if let Ok(managers) = self.level3_provider_managers.read() {
            for provider_manager in managers.values() {
                provider_manager.disable();
            }
        }
    }
}

impl std::fmt::Debug for RadarProductManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarProductManager")
            .field("radar_id", &self.radar_id)
            .finish()
    }
}

/// Run a load body on the worker pool: acquire the decode mutex, produce the
/// file, create and store its record under the owning site's manager, then
/// complete the request.
fn spawn_load<F>(
    context: Arc<IngestContext>,
    load_mutex: Arc<AsyncMutex<()>>,
    load: F,
    request: Option<Arc<NexradFileRequest>>,
    index_filename: Option<String>,
) where
    F: Future<Output = Result<Arc<NexradFile>, IngestError>> + Send + 'static,
{
    tokio::spawn(async move {
        let guard = load_mutex.lock().await;

        let record = match load.await {
            Ok(file) => match RadarProductRecord::from_file(file) {
                Ok(record) => {
                    let record = Arc::new(record);
                    let manager = context.instance(record.radar_id());

                    let init_manager = Arc::clone(&manager);
                    if tokio::task::spawn_blocking(move || init_manager.initialize())
                        .await
                        .is_err()
                    {
                        log::warn!("Coordinate initialization task failed");
                    }

                    let stored = manager.store_record(record);

                    if let Some(filename) = index_filename {
                        context.index_file(&filename, Arc::clone(&stored));
                    }

                    Some(stored)
                }
                Err(e) => {
                    log::warn!("Could not create product record: {}", e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Could not load NEXRAD data: {}", e);
                None
            }
        };

        drop(guard);

        if let Some(request) = request {
            request.set_record(record);
            request.complete();
            context.publish(Event::RequestComplete { request });
        }
    });
}
