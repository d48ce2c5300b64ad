use crate::error::Result;
use crate::model::{Customer, DateRecord, Fact, Product};

/// Abstraction over the transactional destination warehouse.
///
/// A `WarehouseSink` exposes raw, per-dimension primitives only — the
/// natural-key → surrogate-key caching logic lives above it in
/// `salesdw-engine`'s dimension cache. Schema bootstrap (creating the
/// tables this trait inserts into) is an external collaborator's job and
/// is not part of this interface.
///
/// Implementations are driven exclusively from the joiner thread and so
/// need no internal synchronization of their own.
pub trait WarehouseSink: Send {
    /// Scan `DimCustomer` for existing `(Customer_ID, CustomerKey)` pairs,
    /// used to warm the dimension cache at startup.
    fn load_customer_keys(&mut self) -> Result<Vec<(String, i64)>>;
    fn load_product_keys(&mut self) -> Result<Vec<(String, i64)>>;
    fn load_supplier_keys(&mut self) -> Result<Vec<(i64, i64)>>;
    fn load_store_keys(&mut self) -> Result<Vec<(i64, i64)>>;
    fn load_date_keys(&mut self) -> Result<Vec<(String, i64)>>;

    /// Insert a new `DimCustomer` row and return its generated surrogate key.
    fn insert_customer(&mut self, customer: &Customer) -> Result<i64>;
    fn insert_supplier(&mut self, supplier_id: i64, supplier_name: &str) -> Result<i64>;
    fn insert_store(&mut self, store_id: i64, store_name: &str) -> Result<i64>;
    /// Insert a new `DimProduct` row, foreign-keyed to an already-resolved
    /// supplier and store.
    fn insert_product(&mut self, product: &Product, supplier_key: i64, store_key: i64)
        -> Result<i64>;
    fn insert_date(&mut self, date: &DateRecord) -> Result<i64>;

    /// Insert a fully-resolved fact row.
    fn insert_fact(&mut self, fact: &Fact) -> Result<()>;

    /// Commit everything inserted since the last commit (or since open).
    fn commit(&mut self) -> Result<()>;

    /// Close the underlying connection. Called exactly once, after the
    /// producer and joiner threads have both finished.
    fn close(&mut self) -> Result<()>;
}
