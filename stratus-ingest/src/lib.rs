//! # Stratus Ingest
//!
//! Concurrent radar product ingest, caching, and refresh scheduling.
//!
//! This crate sits between remote NEXRAD object stores (consumed through the
//! [`provider::DataProvider`] capability), on-disk NEXRAD files, and
//! downstream viewers that consume decoded volumes. Decoding itself lives in
//! [`stratus_core`]; this crate owns the concurrency.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      IngestContext                         │
//! │  - event channel (broadcast)                               │
//! │  - weak instance registry: radar id → RadarProductManager  │
//! │  - filename index for file-loaded products                 │
//! └──────────────────────────┬─────────────────────────────────┘
//!                            │ instance(radar_id)
//!                            ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │                  RadarProductManager (per site)            │
//! │  - Level-II ProviderManager                                │
//! │  - product → Level-III ProviderManager                     │
//! │  - time-ordered record caches (seconds-truncated keys)     │
//! │  - geodesic coordinate grids (0.5° and 1°)                 │
//! └──────────────────────────┬─────────────────────────────────┘
//!                            │ refresh / find_key / load_object
//!                            ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │              DataProvider (one per group/product)          │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stratus_ingest::provider::DataProvider;
//! use stratus_ingest::{IngestContext, NexradFileRequest, ProviderFactory};
//!
//! struct MyFactory;
//!
//! impl ProviderFactory for MyFactory {
//!     fn create_level2_provider(&self, _radar_id: &str) -> Arc<dyn DataProvider> {
//!         unimplemented!("bridge to an object store client")
//!     }
//!     fn create_level3_provider(&self, _radar_id: &str, _product: &str) -> Arc<dyn DataProvider> {
//!         unimplemented!()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = IngestContext::new(Box::new(MyFactory));
//!     let manager = context.instance("KLSX");
//!
//!     let request = NexradFileRequest::new();
//!     manager.load_file("KLSX20250101_000321_V06", Some(Arc::clone(&request)));
//!     request.wait().await;
//!
//!     if let Some(record) = request.radar_product_record() {
//!         println!("Loaded {} at {}", record.radar_id(), record.time());
//!     }
//! }
//! ```

pub mod config;
pub mod context;
pub mod coordinates;
pub mod error;
pub mod event;
pub mod manager;
pub mod products;
pub mod provider;
pub mod provider_manager;
pub mod record;
pub mod request;

// Re-export the primary API surface
pub use config::RadarSite;
pub use context::{IngestContext, ProviderFactory};
pub use error::IngestError;
pub use event::Event;
pub use manager::RadarProductManager;
pub use products::{Level3CategoryMap, Level3ProductCategory};
pub use record::{RadarProductRecord, RadarProductRecordMap};
pub use request::NexradFileRequest;
