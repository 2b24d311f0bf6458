//! Root ingest context
//!
//! The context is constructed once by the application and owns everything
//! that is process-wide in nature: the typed event channel, the weak
//! instance registry handing out per-site product managers, the filename
//! index for file-loaded products, and the provider factory managers use to
//! construct their data providers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};

use tokio::sync::broadcast;
use tokio::sync::Mutex as AsyncMutex;

use crate::event::{Event, EventReceiver, EventSender, EVENT_CHANNEL_CAPACITY};
use crate::manager::RadarProductManager;
use crate::provider::DataProvider;
use crate::record::RadarProductRecord;

/// Constructs data providers for managers on demand
pub trait ProviderFactory: Send + Sync {
    fn create_level2_provider(&self, radar_id: &str) -> Arc<dyn DataProvider>;
    fn create_level3_provider(&self, radar_id: &str, product: &str) -> Arc<dyn DataProvider>;
}

pub struct IngestContext {
    provider_factory: Box<dyn ProviderFactory>,
    event_tx: EventSender,
    instances: Mutex<HashMap<String, Weak<RadarProductManager>>>,
    file_index: RwLock<HashMap<String, Arc<RadarProductRecord>>>,
    file_load_mutex: Arc<AsyncMutex<()>>,
    weak_self: Weak<IngestContext>,
}

impl IngestContext {
    pub fn new(provider_factory: Box<dyn ProviderFactory>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Arc::new_cyclic(|weak_self| IngestContext {
            provider_factory,
            event_tx,
            instances: Mutex::new(HashMap::new()),
            file_index: RwLock::new(HashMap::new()),
            file_load_mutex: Arc::new(AsyncMutex::new(())),
            weak_self: weak_self.clone(),
        })
    }

    /// Subscribe to ingest events
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    /// Shared product manager for a radar site. Constructs a manager on
    /// first request; the registry keeps only a weak reference, so a manager
    /// lives as long as its strongest caller.
    pub fn instance(&self, radar_id: &str) -> Arc<RadarProductManager> {
        let mut instance_created = false;

        let instance = {
            let mut instances = self.instances.lock().unwrap();

            // The weak pointer may refer to a manager every caller has
            // since dropped
            match instances.get(radar_id).and_then(Weak::upgrade) {
                Some(instance) => instance,
                None => {
                    // The upgrade cannot fail: the caller reaches this
                    // context through a live Arc
                    let context = self
                        .weak_self
                        .upgrade()
                        .expect("context is constructed via Arc::new_cyclic");

                    let instance = RadarProductManager::new(context, radar_id);
                    instances.insert(radar_id.to_string(), Arc::downgrade(&instance));
                    instance_created = true;
                    instance
                }
            }
        };

        if instance_created {
            self.publish(Event::RadarProductManagerCreated {
                radar_id: radar_id.to_string(),
            });
        }

        instance
    }

    /// Clear the file index and the instance registry
    pub fn cleanup(&self) {
        self.file_index.write().unwrap().clear();
        self.instances.lock().unwrap().clear();
    }

    pub(crate) fn publish(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    pub(crate) fn events(&self) -> &EventSender {
        &self.event_tx
    }

    pub(crate) fn provider_factory(&self) -> &dyn ProviderFactory {
        self.provider_factory.as_ref()
    }

    pub(crate) fn indexed_file(&self, filename: &str) -> Option<Arc<RadarProductRecord>> {
        self.file_index.read().unwrap().get(filename).cloned()
    }

    pub(crate) fn index_file(&self, filename: &str, record: Arc<RadarProductRecord>) {
        self.file_index
            .write()
            .unwrap()
            .insert(filename.to_string(), record);
    }

    pub(crate) fn file_load_mutex(&self) -> Arc<AsyncMutex<()>> {
        Arc::clone(&self.file_load_mutex)
    }
}

impl std::fmt::Debug for IngestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IngestContext {{ }}")
    }
}
