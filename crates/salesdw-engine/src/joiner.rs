use crate::dimension_cache::DimensionCaches;
use salesdw_core::{round2, Customer, EngineConfig, Fact, Result, StreamBuffer, Transaction, WarehouseSink};
use salesdw_io::ProductPartitions;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the joiner sleeps when it has admitted nothing and has no
/// pending product key to scan for.
const IDLE_SLEEP: Duration = Duration::from_millis(50);

/// The consumer side of the pipeline: bounded hash admission, FIFO
/// partition-driven matching, and batched fact commits.
///
/// Everything here runs on a single thread; the only thing it shares with
/// the producer is the [`StreamBuffer`] it drains from.
pub struct HybridJoiner<'a> {
    config: &'a EngineConfig,
    partitions: &'a ProductPartitions,
    customers_by_id: &'a HashMap<String, Customer>,
    sink: &'a mut dyn WarehouseSink,
    caches: DimensionCaches,

    hash_table: HashMap<String, Vec<Transaction>>,
    queue: VecDeque<String>,
    hash_slots_used: usize,
    facts_pending: usize,

    pub facts_emitted: usize,
    pub dropped_unknown_product: usize,
}

/// Summary returned once the joiner has drained the stream and emptied its
/// hash table.
#[derive(Debug, Default)]
pub struct JoinerReport {
    pub facts_emitted: usize,
    pub dropped_unknown_product: usize,
    pub commits: usize,
}

impl<'a> HybridJoiner<'a> {
    pub fn new(
        config: &'a EngineConfig,
        partitions: &'a ProductPartitions,
        customers_by_id: &'a HashMap<String, Customer>,
        sink: &'a mut dyn WarehouseSink,
    ) -> Result<Self> {
        let caches = DimensionCaches::warm(sink)?;
        Ok(Self {
            config,
            partitions,
            customers_by_id,
            sink,
            caches,
            hash_table: HashMap::new(),
            queue: VecDeque::new(),
            hash_slots_used: 0,
            facts_pending: 0,
            facts_emitted: 0,
            dropped_unknown_product: 0,
        })
    }

    /// Runs the main loop to completion: until the producer has signaled
    /// done and the hash table is empty.
    pub fn run(mut self, buffer: &StreamBuffer) -> Result<JoinerReport> {
        let mut commits = 0usize;

        loop {
            self.admit(buffer);

            if buffer.producer_done() && self.hash_table.is_empty() {
                break;
            }

            let Some(key) = self.queue.pop_front() else {
                std::thread::sleep(IDLE_SLEEP);
                continue;
            };

            match self.partitions.partition_of(&key) {
                None => {
                    if let Some(orphaned) = self.hash_table.remove(&key) {
                        self.hash_slots_used -= orphaned.len();
                        self.dropped_unknown_product += orphaned.len();
                        warn!(product_id = %key, dropped = orphaned.len(), "unknown product, dropping buffered transactions");
                    }
                    continue;
                }
                Some(partition_index) => {
                    self.scan_partition(partition_index)?;
                }
            }

            if self.facts_pending >= self.config.commit_batch {
                self.sink.commit()?;
                commits += 1;
                debug!(facts_pending = self.facts_pending, "commit gate triggered");
                self.facts_pending = 0;
            }
        }

        if self.facts_pending > 0 {
            self.sink.commit()?;
            commits += 1;
        }

        info!(
            facts_emitted = self.facts_emitted,
            dropped_unknown_product = self.dropped_unknown_product,
            commits,
            "hybrid joiner finished"
        );

        Ok(JoinerReport {
            facts_emitted: self.facts_emitted,
            dropped_unknown_product: self.dropped_unknown_product,
            commits,
        })
    }

    /// Admission phase: drain the shared buffer into the hash table while
    /// under `HS`.
    fn admit(&mut self, buffer: &StreamBuffer) {
        let mut drained_total = 0usize;
        while self.hash_slots_used < self.config.hs {
            let room = self.config.hs - self.hash_slots_used;
            let drained = buffer.drain_up_to(room);
            if drained.is_empty() {
                break;
            }
            for transaction in drained {
                self.queue.push_back(transaction.product_id.clone());
                self.hash_table
                    .entry(transaction.product_id.clone())
                    .or_default()
                    .push(transaction);
                self.hash_slots_used += 1;
                drained_total += 1;
            }
        }
        if drained_total > 0 {
            debug!(drained = drained_total, hash_slots_used = self.hash_slots_used, "admission phase drained rows");
        }
    }

    /// Scans one partition, flushing every pending key it resolves.
    fn scan_partition(&mut self, partition_index: usize) -> Result<()> {
        let mut rows_scanned = 0usize;
        let mut matches = 0usize;
        for product in self.partitions.load(partition_index) {
            rows_scanned += 1;
            let Some(pending) = self.hash_table.remove(&product.product_id) else {
                continue;
            };
            matches += 1;
            self.hash_slots_used -= pending.len();

            let supplier_key = self.caches.get_or_create_supplier(
                self.sink,
                product.supplier_id,
                &product.supplier_name,
            )?;
            let store_key =
                self.caches
                    .get_or_create_store(self.sink, product.store_id, &product.store_name)?;
            let product_key =
                self.caches
                    .get_or_create_product(self.sink, product, supplier_key, store_key)?;

            for transaction in pending {
                let customer = self.customers_by_id.get(&transaction.customer_id);
                let customer_key = self.caches.get_or_create_customer(
                    self.sink,
                    &transaction.customer_id,
                    customer,
                )?;
                let date = salesdw_core::date::derive(&transaction.date);
                let date_key = self.caches.get_or_create_date(self.sink, &date)?;

                let fact = Fact {
                    customer_key,
                    product_key,
                    supplier_key,
                    store_key,
                    date_key,
                    order_id: transaction.order_id,
                    quantity: transaction.quantity,
                    revenue: round2(transaction.quantity as f64 * product.price),
                };
                self.sink.insert_fact(&fact)?;
                self.facts_emitted += 1;
                self.facts_pending += 1;
            }
        }
        debug!(
            partition_index,
            rows_scanned,
            matches,
            "partition scan complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdw_core::Product;
    use salesdw_io::MemorySink;
    use std::path::PathBuf;

    fn config() -> EngineConfig {
        let mut cfg = EngineConfig::with_paths(
            PathBuf::from("t.csv"),
            PathBuf::from("p.csv"),
            PathBuf::from("c.csv"),
        );
        cfg.commit_batch = 1;
        cfg
    }

    fn product(id: &str, price: f64) -> Product {
        Product {
            product_id: id.to_string(),
            category: "A".to_string(),
            price,
            supplier_id: 1,
            supplier_name: "Sn1".to_string(),
            store_id: 1,
            store_name: "Tn1".to_string(),
        }
    }

    fn txn(order_id: &str, product_id: &str, qty: i64) -> Transaction {
        Transaction {
            order_id: order_id.to_string(),
            customer_id: "C1".to_string(),
            product_id: product_id.to_string(),
            quantity: qty,
            date: "2017-06-15".to_string(),
        }
    }

    #[test]
    fn single_admissible_row_emits_one_fact_with_correct_revenue() {
        let partitions = ProductPartitions::build(vec![product("P1", 10.00)], 500);
        let customers = HashMap::from([(
            "C1".to_string(),
            Customer {
                customer_id: "C1".to_string(),
                gender: "F".to_string(),
                age: "26-35".to_string(),
                occupation: "1".to_string(),
                city_category: "A".to_string(),
                stay_in_current_city_years: "2".to_string(),
                marital_status: 0,
            },
        )]);
        let mut sink = MemorySink::new();
        let cfg = config();
        let buffer = StreamBuffer::new();
        buffer.push(txn("O1", "P1", 3));
        buffer.mark_producer_done();

        let joiner = HybridJoiner::new(&cfg, &partitions, &customers, &mut sink).unwrap();
        let report = joiner.run(&buffer).unwrap();

        assert_eq!(report.facts_emitted, 1);
        assert_eq!(sink.facts.len(), 1);
        assert_eq!(sink.facts[0].quantity, 3);
        assert_eq!(sink.facts[0].revenue, 30.00);
    }

    #[test]
    fn unknown_product_is_dropped_and_hash_slots_return_to_zero() {
        let partitions = ProductPartitions::build(vec![product("P1", 10.00)], 500);
        let customers = HashMap::new();
        let mut sink = MemorySink::new();
        let cfg = config();
        let buffer = StreamBuffer::new();
        buffer.push(txn("O1", "P1", 1));
        buffer.push(txn("O2", "P2", 1));
        buffer.mark_producer_done();

        let joiner = HybridJoiner::new(&cfg, &partitions, &customers, &mut sink).unwrap();
        let report = joiner.run(&buffer).unwrap();

        assert_eq!(report.facts_emitted, 1);
        assert_eq!(report.dropped_unknown_product, 1);
    }

    #[test]
    fn backpressure_respects_hs_cap_and_drains_fully() {
        let partitions = ProductPartitions::build(vec![product("P1", 1.00)], 500);
        let customers = HashMap::new();
        let mut sink = MemorySink::new();
        let mut cfg = config();
        cfg.hs = 4;
        let buffer = StreamBuffer::new();
        for i in 0..100 {
            buffer.push(txn(&format!("O{i}"), "P1", 1));
        }
        buffer.mark_producer_done();

        let joiner = HybridJoiner::new(&cfg, &partitions, &customers, &mut sink).unwrap();
        let report = joiner.run(&buffer).unwrap();

        assert_eq!(report.facts_emitted, 100);
        assert_eq!(sink.facts.len(), 100);
    }

    #[test]
    fn bad_date_falls_back_to_documented_default() {
        let partitions = ProductPartitions::build(vec![product("P1", 10.00)], 500);
        let customers = HashMap::new();
        let mut sink = MemorySink::new();
        let cfg = config();
        let buffer = StreamBuffer::new();
        buffer.push(Transaction {
            order_id: "O1".to_string(),
            customer_id: "C1".to_string(),
            product_id: "P1".to_string(),
            quantity: 1,
            date: "not-a-date".to_string(),
        });
        buffer.mark_producer_done();

        let joiner = HybridJoiner::new(&cfg, &partitions, &customers, &mut sink).unwrap();
        joiner.run(&buffer).unwrap();

        let (_, date_row) = sink.dates.get(salesdw_core::date::FALLBACK_DATE).unwrap();
        assert_eq!(date_row.full_date, salesdw_core::date::FALLBACK_DATE);
    }

    #[test]
    fn price_normalization_flows_through_to_revenue() {
        let partitions = ProductPartitions::build(vec![product("P1", 12.50)], 500);
        let customers = HashMap::new();
        let mut sink = MemorySink::new();
        let cfg = config();
        let buffer = StreamBuffer::new();
        buffer.push(txn("O1", "P1", 4));
        buffer.mark_producer_done();

        let joiner = HybridJoiner::new(&cfg, &partitions, &customers, &mut sink).unwrap();
        joiner.run(&buffer).unwrap();

        assert_eq!(sink.facts[0].revenue, 50.00);
    }
}
