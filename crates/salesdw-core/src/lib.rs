//! # salesdw-core
//!
//! Domain model, layered configuration, error taxonomy, the shared
//! producer/consumer buffer, and the `WarehouseSink` abstraction that
//! together underpin the salesdw hybrid-join ETL engine.
//!
//! This crate has no opinion on *how* master data is loaded, *how* the
//! stream is read, or *how* rows land in a warehouse — those concerns live
//! in `salesdw-io`. It only defines the shapes everything else agrees on.

pub mod buffer;
pub mod config;
pub mod date;
pub mod error;
pub mod model;
pub mod sink;

pub use buffer::StreamBuffer;
pub use config::{ConfigFile, EngineConfig};
pub use error::{EngineError, Result};
pub use model::{round2, Customer, DateRecord, Fact, Product, Transaction};
pub use sink::WarehouseSink;
