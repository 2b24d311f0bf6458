//! Data provider capability and object-catalog bookkeeping
//!
//! A [`DataProvider`] fronts one remote listing: one instance per Level-II
//! site, one per (site, Level-III product). The core treats every provider
//! call as blocking and runs it on worker tasks.
//!
//! [`ObjectCatalog`] is the bookkeeping every concrete provider needs: a
//! time-ordered key map with bounded lookup, per-day pruning, and metadata
//! derivation for refresh scheduling.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use stratus_core::wsr88d::NexradFile;

use crate::error::IngestError;

/// Bound on the number of catalogued objects before old dates are pruned
const MAX_OBJECTS: usize = 2500;

/// Keep at least today, yesterday, and one more date
const MIN_DATES_BEFORE_PRUNING: usize = 4;

/// Remote object listing and retrieval capability
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Rescan the remote listing. Returns `(new_objects, total_objects)`:
    /// the number of objects newly discovered and the total visible.
    async fn refresh(&self) -> Result<(usize, usize), IngestError>;

    /// Key of the most recent object, if any
    async fn find_latest_key(&self) -> Option<String>;

    /// Key of the object whose start time is the greatest not after `time`
    async fn find_key(&self, time: DateTime<Utc>) -> Option<String>;

    /// Start time of the object stored under `key`
    async fn time_point_by_key(&self, key: &str) -> Option<DateTime<Utc>>;

    /// Fetch and decode the object stored under `key`
    async fn load_object_by_key(&self, key: &str) -> Result<NexradFile, IngestError>;

    /// Observed interval between consecutive objects
    fn update_period(&self) -> Duration;

    /// Modification time of the most recent object
    fn last_modified(&self) -> Option<DateTime<Utc>>;

    /// Request the provider's available-product listing (Level-III only)
    async fn request_available_products(&self) {}

    /// Product codes visible in the remote listing (Level-III only)
    async fn available_products(&self) -> Vec<String> {
        Vec::new()
    }
}

/// One catalogued remote object
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Time-ordered catalog of remote objects
#[derive(Debug, Default)]
pub struct ObjectCatalog {
    objects: BTreeMap<DateTime<Utc>, ObjectEntry>,
    object_dates: VecDeque<NaiveDate>,
    last_modified: Option<DateTime<Utc>>,
    update_period: Duration,
}

impl ObjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Insert or replace an object. Returns whether the time key was new.
    pub fn insert(&mut self, time: DateTime<Utc>, key: String, last_modified: DateTime<Utc>) -> bool {
        self.objects
            .insert(time, ObjectEntry { key, last_modified })
            .is_none()
    }

    /// Record that a listing for `date` produced objects. The date moves to
    /// the back of the pruning order.
    pub fn record_date(&mut self, date: NaiveDate) {
        self.object_dates.retain(|d| *d != date);
        self.object_dates.push_back(date);
    }

    /// Key of the object whose time is the greatest not after `time`
    pub fn find_key(&self, time: DateTime<Utc>) -> Option<String> {
        self.objects
            .range(..=time)
            .next_back()
            .map(|(_, entry)| entry.key.clone())
    }

    pub fn find_latest_key(&self) -> Option<String> {
        self.objects
            .last_key_value()
            .map(|(_, entry)| entry.key.clone())
    }

    /// Time of the object stored under `key`
    pub fn time_point_by_key(&self, key: &str) -> Option<DateTime<Utc>> {
        self.objects
            .iter()
            .find(|(_, entry)| entry.key == key)
            .map(|(time, _)| *time)
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn update_period(&self) -> Duration {
        self.update_period
    }

    /// Drop objects from the oldest dates while the catalog exceeds its
    /// object bound. Today and yesterday are always kept.
    pub fn prune(&mut self, today: NaiveDate) {
        let yesterday = today.pred_opt().unwrap_or(today);

        while self.objects.len() > MAX_OBJECTS
            && self.object_dates.len() >= MIN_DATES_BEFORE_PRUNING
        {
            let Some(position) = self.object_dates.iter().position(|d| *d < yesterday) else {
                break;
            };
            let date = self.object_dates[position];

            let begin = date
                .and_hms_opt(0, 0, 0)
                .map(|t| t.and_utc())
                .unwrap_or_default();
            let end = begin + chrono::Duration::days(1);

            let keys: Vec<DateTime<Utc>> =
                self.objects.range(begin..end).map(|(t, _)| *t).collect();
            for key in keys {
                let _ = self.objects.remove(&key);
            }

            let _ = self.object_dates.remove(position);
        }
    }

    /// Derive `last_modified` and `update_period` from the newest objects
    pub fn update_metadata(&mut self) {
        let mut newest = self.objects.values().rev();

        if let Some(last) = newest.next() {
            self.last_modified = Some(last.last_modified);

            if let Some(previous) = newest.next() {
                let delta = last.last_modified - previous.last_modified;
                self.update_period = delta.to_std().unwrap_or(Duration::ZERO);
            }
        }
    }
}
