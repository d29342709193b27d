//! Supplier-to-local inventory synchronization.

use std::time::Duration;

use domain::{Sku, StockLevel};
use futures_util::stream::{self, StreamExt};
use order_store::InventoryStore;
use serde::{Deserialize, Serialize};

use crate::services::supplier::{StockReport, SupplierClient, SupplierError};

/// SKUs per supplier stock call.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Stock calls in flight at once.
const CHUNK_CONCURRENCY: usize = 4;

/// One SKU that could not be synced, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuFailure {
    pub sku: Sku,
    pub error: String,
}

/// Per-SKU outcome of one sync run.
///
/// Every requested SKU lands in exactly one bucket. `unknown` and
/// `failed` SKUs keep their local quantity untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Rows whose local quantity now matches the supplier.
    pub updated: Vec<StockLevel>,

    /// SKUs the supplier did not resolve.
    pub unknown: Vec<Sku>,

    /// SKUs that failed, either inside a batch or with it.
    pub failed: Vec<SkuFailure>,
}

impl SyncReport {
    /// Returns true when every requested SKU was updated.
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty() && self.failed.is_empty()
    }
}

/// Pulls supplier stock levels into the local inventory store.
///
/// The SKU list is split into chunks and the chunk calls run with
/// bounded fan-out; each chunk is applied as soon as its reply lands.
/// Writes are last-write-wins per SKU row, so re-running a sync is
/// idempotent and overlapping runs settle on some complete reply.
pub struct InventorySync<S, I>
where
    S: SupplierClient,
    I: InventoryStore,
{
    supplier: S,
    inventory: I,
    chunk_size: usize,
    call_timeout: Duration,
}

impl<S, I> InventorySync<S, I>
where
    S: SupplierClient,
    I: InventoryStore,
{
    /// Creates a sync over the given supplier and local store.
    pub fn new(supplier: S, inventory: I, call_timeout: Duration) -> Self {
        Self {
            supplier,
            inventory,
            chunk_size: DEFAULT_CHUNK_SIZE,
            call_timeout,
        }
    }

    /// Overrides the number of SKUs per supplier call.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Syncs the given SKUs and reports what happened to each one.
    ///
    /// A failed chunk call fails only the SKUs in that chunk; the rest
    /// of the run proceeds. The run itself never fails.
    #[tracing::instrument(skip(self, skus), fields(sku_count = skus.len()))]
    pub async fn sync_stocks(&self, skus: &[Sku]) -> SyncReport {
        let chunk_futures: Vec<_> = skus
            .chunks(self.chunk_size)
            .map(|chunk| async move { (chunk, self.fetch_chunk(chunk).await) })
            .collect();
        let mut outcomes = stream::iter(chunk_futures).buffer_unordered(CHUNK_CONCURRENCY);

        let mut report = SyncReport::default();
        while let Some((chunk, outcome)) = outcomes.next().await {
            match outcome {
                Ok(batch) => self.apply_chunk(chunk, batch, &mut report).await,
                Err(error) => {
                    tracing::warn!(%error, skus = chunk.len(), "stock batch failed, keeping local levels");
                    for sku in chunk {
                        report.failed.push(SkuFailure {
                            sku: sku.clone(),
                            error: error.to_string(),
                        });
                    }
                }
            }
        }

        report.updated.sort_by(|a, b| a.sku.cmp(&b.sku));
        report.unknown.sort();
        report.failed.sort_by(|a, b| a.sku.cmp(&b.sku));

        metrics::counter!("stock_sync_updated_total").increment(report.updated.len() as u64);
        metrics::counter!("stock_sync_unknown_total").increment(report.unknown.len() as u64);
        metrics::counter!("stock_sync_failed_total").increment(report.failed.len() as u64);
        tracing::info!(
            updated = report.updated.len(),
            unknown = report.unknown.len(),
            failed = report.failed.len(),
            "stock sync finished"
        );
        report
    }

    async fn apply_chunk(&self, chunk: &[Sku], batch: StockReport, report: &mut SyncReport) {
        for sku in chunk {
            if let Some(reason) = batch.failures.get(sku) {
                report.failed.push(SkuFailure {
                    sku: sku.clone(),
                    error: reason.clone(),
                });
            } else if let Some(quantity) = batch.levels.get(sku) {
                match self.inventory.set_quantity(sku, *quantity).await {
                    Ok(()) => report.updated.push(StockLevel::new(sku.clone(), *quantity)),
                    Err(error) => report.failed.push(SkuFailure {
                        sku: sku.clone(),
                        error: error.to_string(),
                    }),
                }
            } else {
                // Absent from the reply means unresolved, never zero.
                tracing::debug!(%sku, "supplier did not resolve sku, keeping local level");
                report.unknown.push(sku.clone());
            }
        }
    }

    async fn fetch_chunk(&self, chunk: &[Sku]) -> Result<StockReport, SupplierError> {
        match tokio::time::timeout(self.call_timeout, self.supplier.stocks(chunk)).await {
            Ok(result) => result,
            Err(_) => Err(SupplierError::Unavailable(format!(
                "stock batch timed out after {:?}",
                self.call_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemorySupplier;
    use order_store::InMemoryInventoryStore;

    type TestSync = InventorySync<InMemorySupplier, InMemoryInventoryStore>;

    struct Setup {
        sync: TestSync,
        supplier: InMemorySupplier,
        inventory: InMemoryInventoryStore,
    }

    fn setup() -> Setup {
        let supplier = InMemorySupplier::new();
        let inventory = InMemoryInventoryStore::new();
        let sync = InventorySync::new(
            supplier.clone(),
            inventory.clone(),
            Duration::from_secs(5),
        );
        Setup {
            sync,
            supplier,
            inventory,
        }
    }

    fn skus(names: &[&str]) -> Vec<Sku> {
        names.iter().copied().map(Sku::new).collect()
    }

    fn levels(rows: &[(&str, u32)]) -> Vec<StockLevel> {
        rows.iter()
            .map(|(sku, quantity)| StockLevel::new(*sku, *quantity))
            .collect()
    }

    #[tokio::test]
    async fn test_sync_applies_supplier_levels() {
        let s = setup();
        s.inventory.set_quantity(&Sku::new("A"), 1).await.unwrap();
        s.inventory.set_quantity(&Sku::new("B"), 2).await.unwrap();
        s.inventory.set_quantity(&Sku::new("C"), 3).await.unwrap();
        s.supplier.set_stock("A", 5);
        s.supplier.set_stock("C", 0);

        let report = s.sync.sync_stocks(&skus(&["A", "B", "C"])).await;

        assert_eq!(report.updated, levels(&[("A", 5), ("C", 0)]));
        assert_eq!(report.unknown, skus(&["B"]));
        assert!(report.failed.is_empty());

        assert_eq!(s.inventory.level(&Sku::new("A")).await.unwrap(), Some(5));
        assert_eq!(s.inventory.level(&Sku::new("B")).await.unwrap(), Some(2));
        assert_eq!(s.inventory.level(&Sku::new("C")).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let s = setup();
        s.inventory.set_quantity(&Sku::new("A"), 1).await.unwrap();
        s.supplier.set_stock("A", 5);

        s.sync.sync_stocks(&skus(&["A"])).await;
        let report = s.sync.sync_stocks(&skus(&["A"])).await;

        assert_eq!(report.updated, levels(&[("A", 5)]));
        assert_eq!(s.inventory.level(&Sku::new("A")).await.unwrap(), Some(5));
        assert_eq!(s.supplier.stock_calls(), 2);
    }

    #[tokio::test]
    async fn test_sync_creates_missing_local_rows() {
        let s = setup();
        s.supplier.set_stock("NEW", 7);

        let report = s.sync.sync_stocks(&skus(&["NEW"])).await;

        assert_eq!(report.updated, levels(&[("NEW", 7)]));
        assert_eq!(s.inventory.level(&Sku::new("NEW")).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_whole_batch_failure_keeps_local_levels() {
        let s = setup();
        s.inventory.set_quantity(&Sku::new("A"), 1).await.unwrap();
        s.supplier.set_stock("A", 5);
        s.supplier.set_fail_on_stocks(true);

        let report = s.sync.sync_stocks(&skus(&["A", "B"])).await;

        assert!(report.updated.is_empty());
        assert!(report.unknown.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed[0].error.contains("unavailable"));
        assert_eq!(s.inventory.level(&Sku::new("A")).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_broken_sku_fails_alone() {
        let s = setup();
        s.supplier.set_stock("A", 5);
        s.supplier.set_broken_sku("B", "feed error");

        let report = s.sync.sync_stocks(&skus(&["A", "B"])).await;

        assert_eq!(report.updated, levels(&[("A", 5)]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].sku, Sku::new("B"));
        assert_eq!(report.failed[0].error, "feed error");
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_small_chunks_issue_one_call_each() {
        let s = setup();
        let sync = InventorySync::new(
            s.supplier.clone(),
            s.inventory.clone(),
            Duration::from_secs(5),
        )
        .with_chunk_size(1);
        s.supplier.set_stock("A", 1);
        s.supplier.set_stock("B", 2);
        s.supplier.set_stock("C", 3);

        let report = sync.sync_stocks(&skus(&["A", "B", "C"])).await;

        assert_eq!(report.updated, levels(&[("A", 1), ("B", 2), ("C", 3)]));
        assert!(report.is_clean());
        assert_eq!(s.supplier.stock_calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_sku_list_is_a_noop() {
        let s = setup();
        let report = s.sync.sync_stocks(&[]).await;

        assert!(report.is_clean());
        assert!(report.updated.is_empty());
        assert_eq!(s.supplier.stock_calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_fails_the_chunk() {
        let s = setup();
        s.supplier.set_stock("A", 5);
        s.supplier.set_latency(Duration::from_millis(100));
        let sync = InventorySync::new(
            s.supplier.clone(),
            s.inventory.clone(),
            Duration::from_millis(10),
        );

        let report = sync.sync_stocks(&skus(&["A"])).await;

        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].error.contains("timed out"));
    }
}
