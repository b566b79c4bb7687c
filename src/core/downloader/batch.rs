use std::future::Future;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Batch widths used by the synchronizers.
pub const LIBRARY_BATCH: usize = 10;
pub const ASSET_BATCH: usize = 50;
pub const PACKAGE_BATCH: usize = 20;

/// Settled state after every unit ran.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<(T, LauncherError)>,
}

impl<T> BatchReport<T> {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Runs independent async units in fixed-size batches.
///
/// All units of a batch are in flight together and batch N+1 starts only once
/// every unit of batch N has settled. A failing unit is recorded and never
/// cancels its siblings, except that a fatal (filesystem) error stops the run
/// once its batch has settled.
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    batch_size: usize,
}

impl BatchScheduler {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run `unit` over `items`. `on_batch(settled, total)` fires once per batch
    /// with a non-decreasing `settled` count.
    pub async fn run<T, F, Fut, P>(
        &self,
        items: Vec<T>,
        unit: F,
        mut on_batch: P,
    ) -> LauncherResult<BatchReport<T>>
    where
        T: Clone,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), LauncherError>>,
        P: FnMut(usize, usize),
    {
        let total = items.len();
        let mut report = BatchReport {
            succeeded: Vec::with_capacity(total),
            failed: Vec::new(),
        };

        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            debug!("Batch {} ({} units)", index + 1, chunk.len());
            let unit = &unit;
            let settled = join_all(chunk.iter().cloned().map(|item| async move {
                let result = unit(item.clone()).await;
                (item, result)
            }))
            .await;

            let mut fatal = None;
            for (item, result) in settled {
                match result {
                    Ok(()) => report.succeeded.push(item),
                    Err(e) if e.is_fatal() && fatal.is_none() => fatal = Some(e),
                    Err(e) => {
                        warn!("Unit failed: {}", e);
                        report.failed.push((item, e));
                    }
                }
            }

            if let Some(e) = fatal {
                warn!("Stopping after batch {}: {}", index + 1, e);
                return Err(e);
            }
            on_batch(report.succeeded.len() + report.failed.len(), total);
        }

        Ok(report)
    }
}
