//! Decoded product records and their time-ordered caches

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use stratus_core::wsr88d::{Level2File, Level3File, NexradFile};
use stratus_core::RadarProductGroup;

use crate::error::IngestError;

/// Truncate a time point to whole seconds; record cache keys use this
pub fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}

/// An immutable decoded product record
#[derive(Debug, Clone)]
pub struct RadarProductRecord {
    time: DateTime<Utc>,
    group: RadarProductGroup,
    product: String,
    radar_id: String,
    file: Arc<NexradFile>,
}

impl RadarProductRecord {
    pub fn from_file(file: Arc<NexradFile>) -> Result<Self, IngestError> {
        let radar_id = file.radar_id();
        if radar_id.trim().is_empty() {
            return Err(IngestError::InvalidArgument(
                "decoded file has no radar identifier".into(),
            ));
        }

        Ok(RadarProductRecord {
            time: file.start_time(),
            group: file.group(),
            product: file.product().to_string(),
            radar_id,
            file,
        })
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn radar_product_group(&self) -> RadarProductGroup {
        self.group
    }

    /// Product code; empty for Level-II records
    pub fn radar_product(&self) -> &str {
        &self.product
    }

    pub fn radar_id(&self) -> &str {
        &self.radar_id
    }

    pub fn nexrad_file(&self) -> Arc<NexradFile> {
        Arc::clone(&self.file)
    }

    pub fn level2_file(&self) -> Option<&Level2File> {
        self.file.level2()
    }

    pub fn level3_file(&self) -> Option<&Level3File> {
        self.file.level3()
    }
}

/// Time-ordered record cache keyed by seconds-truncated record time
#[derive(Debug, Default)]
pub struct RadarProductRecordMap {
    records: BTreeMap<DateTime<Utc>, Arc<RadarProductRecord>>,
}

impl RadarProductRecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Insert a record, deduplicating by seconds-truncated time. When a
    /// record already exists at the same second, the stored record is
    /// returned and the new one discarded.
    pub fn store(&mut self, record: Arc<RadarProductRecord>) -> Arc<RadarProductRecord> {
        let key = truncate_to_seconds(record.time());

        match self.records.get(&key) {
            Some(existing) => {
                log::debug!("Product previously loaded, reusing cached record");
                Arc::clone(existing)
            }
            None => {
                self.records.insert(key, Arc::clone(&record));
                record
            }
        }
    }

    /// Record stored at exactly this second, if any
    pub fn get_exact(&self, time: DateTime<Utc>) -> Option<Arc<RadarProductRecord>> {
        self.records.get(&truncate_to_seconds(time)).cloned()
    }

    /// Record with the greatest key not after `time`
    pub fn get_bounded(&self, time: DateTime<Utc>) -> Option<Arc<RadarProductRecord>> {
        self.records
            .range(..=truncate_to_seconds(time))
            .next_back()
            .map(|(_, record)| Arc::clone(record))
    }

    /// Most recent record in the cache
    pub fn latest(&self) -> Option<Arc<RadarProductRecord>> {
        self.records
            .last_key_value()
            .map(|(_, record)| Arc::clone(record))
    }
}
