//! # salesdw-io
//!
//! Concrete I/O for the salesdw ETL engine: the master CSV loader (with
//! partitioning), the stream producer, and two `WarehouseSink`
//! implementations — a Postgres-backed one for production use and an
//! in-memory one for dry runs and tests.

pub mod master_loader;
pub mod memory_sink;
pub mod postgres_sink;
pub mod stream_source;

pub use master_loader::{load_customers, load_products, ProductPartitions};
pub use memory_sink::MemorySink;
pub use postgres_sink::PostgresSink;
pub use stream_source::{run_producer, ProducerReport};
