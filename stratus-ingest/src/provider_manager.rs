//! Per-provider refresh scheduling
//!
//! Each provider manager owns one [`DataProvider`] and drives its refresh
//! state machine: `Idle`, `RefreshingNow`, `Scheduled`. At most one refresh
//! body is in flight per provider; rearming happens in the refresh body and
//! is guarded by the timer mutex. Disabling cancels the armed timer, and an
//! in-flight body will not rearm once refresh is disabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use stratus_core::RadarProductGroup;
use tokio::task::JoinHandle;

use crate::event::{Event, EventSender};
use crate::provider::DataProvider;

/// Floor on the interval between refresh attempts
pub const RETRY_INTERVAL: Duration = Duration::from_secs(15);

pub struct ProviderManager {
    radar_id: String,
    group: RadarProductGroup,
    /// Product code; empty for Level-II
    product: String,
    refresh_enabled: AtomicBool,
    provider: Arc<dyn DataProvider>,
    refresh_timer: Mutex<Option<JoinHandle<()>>>,
    event_tx: EventSender,
    weak_self: Weak<ProviderManager>,
}

impl ProviderManager {
    pub fn new(
        radar_id: &str,
        group: RadarProductGroup,
        product: &str,
        provider: Arc<dyn DataProvider>,
        event_tx: EventSender,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| ProviderManager {
            radar_id: radar_id.to_string(),
            group,
            product: product.to_string(),
            refresh_enabled: AtomicBool::new(false),
            provider,
            refresh_timer: Mutex::new(None),
            event_tx,
            weak_self: weak_self.clone(),
        })
    }

    pub fn name(&self) -> String {
        if self.group == RadarProductGroup::Level3 {
            format!("{}, {}, {}", self.radar_id, self.group, self.product)
        } else {
            format!("{}, {}", self.radar_id, self.group)
        }
    }

    pub fn provider(&self) -> &Arc<dyn DataProvider> {
        &self.provider
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn refresh_enabled(&self) -> bool {
        self.refresh_enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable periodic refresh. Enabling issues an immediate
    /// refresh; disabling cancels the armed timer.
    pub fn set_refresh_enabled(&self, enabled: bool) {
        if self.refresh_enabled.swap(enabled, Ordering::SeqCst) != enabled {
            if enabled {
                self.refresh_data();
            } else {
                self.disable();
            }
        }
    }

    /// Cancel the armed timer and stop refreshing
    pub fn disable(&self) {
        self.refresh_enabled.store(false, Ordering::SeqCst);

        let mut timer = self.refresh_timer.lock().unwrap();
        if let Some(handle) = timer.take() {
            handle.abort();
            log::debug!("[{}] Data refresh timer cancelled", self.name());
        }
    }

    /// Issue a refresh now. The body runs on the worker pool.
    pub fn refresh_data(&self) {
        log::debug!("RefreshData: {}", self.name());

        {
            let mut timer = self.refresh_timer.lock().unwrap();
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }

        let Some(this) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            this.run_refresh().await;
        });
    }

    async fn run_refresh(self: Arc<Self>) {
        let mut interval = RETRY_INTERVAL;

        match self.provider.refresh().await {
            Ok((new_objects, total_objects)) => {
                if new_objects > 0 {
                    if let Some(latest_time) = match self.provider.find_latest_key().await {
                        Some(key) => self.provider.time_point_by_key(&key).await,
                        None => None,
                    } {
                        let update_period = self.provider.update_period();
                        let elapsed = self
                            .provider
                            .last_modified()
                            .and_then(|t| (Utc::now() - t).to_std().ok())
                            .unwrap_or(Duration::ZERO);

                        interval = update_period.saturating_sub(elapsed).max(RETRY_INTERVAL);

                        let _ = self.event_tx.send(Event::NewDataAvailable {
                            group: self.group,
                            product: self.product.clone(),
                            latest_time,
                        });
                    }
                } else if self.refresh_enabled() && total_objects == 0 {
                    log::info!("[{}] No data found, disabling refresh", self.name());
                    self.refresh_enabled.store(false, Ordering::SeqCst);
                }
            }
            Err(e) => {
                log::warn!("[{}] Refresh failed: {}", self.name(), e);
            }
        }

        if self.refresh_enabled() {
            self.schedule_refresh(interval);
        }
    }

    fn schedule_refresh(&self, interval: Duration) {
        let Some(this) = self.weak_self.upgrade() else {
            return;
        };

        let mut timer = self.refresh_timer.lock().unwrap();

        log::debug!("[{}] Scheduled refresh in {:?}", self.name(), interval);

        if let Some(handle) = timer.take() {
            handle.abort();
        }

        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            this.refresh_data();
        }));
    }
}

impl Drop for ProviderManager {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.refresh_timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderManager")
            .field("name", &self.name())
            .field("refresh_enabled", &self.refresh_enabled())
            .finish()
    }
}
