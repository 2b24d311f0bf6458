//! Per-request completion handles
//!
//! A load request is shared between the caller and the decode worker. The
//! worker sets the decoded record (or leaves it empty on failure) and marks
//! the request complete; the caller can await completion or poll the record.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::record::RadarProductRecord;

pub struct NexradFileRequest {
    record: Mutex<Option<Arc<RadarProductRecord>>>,
    done: watch::Sender<bool>,
}

impl NexradFileRequest {
    pub fn new() -> Arc<Self> {
        let (done, _) = watch::channel(false);
        Arc::new(NexradFileRequest {
            record: Mutex::new(None),
            done,
        })
    }

    /// The decoded record, present once the request completed successfully
    pub fn radar_product_record(&self) -> Option<Arc<RadarProductRecord>> {
        self.record.lock().unwrap().clone()
    }

    pub fn is_complete(&self) -> bool {
        *self.done.borrow()
    }

    /// Wait until the request has been completed
    pub async fn wait(&self) {
        let mut rx = self.done.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub(crate) fn set_record(&self, record: Option<Arc<RadarProductRecord>>) {
        *self.record.lock().unwrap() = record;
    }

    pub(crate) fn complete(&self) {
        let _ = self.done.send_replace(true);
    }
}

impl std::fmt::Debug for NexradFileRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NexradFileRequest")
            .field("complete", &self.is_complete())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_returns_after_completion() {
        let request = NexradFileRequest::new();
        assert!(!request.is_complete());

        let waiter = {
            let request = Arc::clone(&request);
            tokio::spawn(async move { request.wait().await })
        };

        request.set_record(None);
        request.complete();
        waiter.await.unwrap();

        assert!(request.is_complete());
        assert!(request.radar_product_record().is_none());
    }
}
