use crate::joiner::{HybridJoiner, JoinerReport};
use salesdw_core::{Customer, EngineConfig, Result, StreamBuffer, WarehouseSink};
use salesdw_io::{load_customers, load_products, run_producer, ProductPartitions};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

/// What a completed run accomplished, surfaced to the CLI for its final
/// summary line.
#[derive(Debug)]
pub struct RunReport {
    pub products_loaded: usize,
    pub customers_loaded: usize,
    pub transactions_read: usize,
    pub duplicates_suppressed: usize,
    pub facts_emitted: usize,
    pub dropped_unknown_product: usize,
    pub commits: usize,
}

/// Loads both master tables, then spawns the producer and joiner as two OS
/// threads exactly as laid out by the concurrency model: the producer owns
/// the stream reader and its dedup set, the joiner owns everything else,
/// and the only thing they share is the bounded [`StreamBuffer`].
///
/// The sink is driven entirely from this (the joiner's) thread, so it is
/// taken by unique reference rather than handed across the thread boundary.
pub fn run(config: &EngineConfig, sink: &mut dyn WarehouseSink) -> Result<RunReport> {
    let products = load_products(&config.product_master_csv)?;
    let customers = load_customers(&config.customer_master_csv)?;
    let products_loaded = products.len();
    let customers_loaded = customers.len();

    let customers_by_id: HashMap<String, Customer> = customers
        .into_iter()
        .map(|c| (c.customer_id.clone(), c))
        .collect();
    let partitions = ProductPartitions::build(products, config.vp);

    info!(
        products = products_loaded,
        customers = customers_loaded,
        partitions = partitions.partition_count(),
        "master data loaded"
    );

    let buffer = Arc::new(StreamBuffer::new());
    let transactional_csv = config.transactional_csv.clone();
    let stream_sleep = config.stream_sleep;
    let producer_buffer = buffer.clone();

    let producer_handle = thread::Builder::new()
        .name("salesdw-producer".to_string())
        .spawn(move || run_producer(&transactional_csv, producer_buffer, stream_sleep))
        .expect("failed to spawn producer thread");

    // Captured rather than propagated with `?` so a joiner failure still
    // lets us join the producer and close the sink before the error
    // reaches the caller, per the orderly-shutdown requirement.
    let joiner_result = HybridJoiner::new(config, &partitions, &customers_by_id, sink)
        .and_then(|joiner| joiner.run(&buffer));

    let producer_report = producer_handle
        .join()
        .expect("producer thread panicked");

    let close_result = sink.close();
    if let Err(e) = &close_result {
        error!(error = %e, "sink close failed");
    }

    let JoinerReport {
        facts_emitted,
        dropped_unknown_product,
        commits,
    } = match joiner_result {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "hybrid joiner failed");
            return Err(e);
        }
    };

    close_result?;

    info!(facts_emitted, commits, "run complete");

    Ok(RunReport {
        products_loaded,
        customers_loaded,
        transactions_read: producer_report.rows_read,
        duplicates_suppressed: producer_report.duplicates,
        facts_emitted,
        dropped_unknown_product,
        commits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdw_io::MemorySink;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn end_to_end_run_against_the_in_memory_sink() {
        let transactional = write_csv(
            "orderID,Customer_ID,Product_ID,quantity,date\n\
             O1,C1,P1,3,2017-06-15\n\
             O1,C1,P1,3,2017-06-15\n\
             O2,C1,P2,1,2017-01-01\n",
        );
        let products = write_csv(
            "Product_ID,Product_Category,price,supplierID,supplierName,storeID,storeName\n\
             P1,A,10.00,1,Sn1,1,Tn1\n",
        );
        let customers = write_csv(
            "Customer_ID,Gender,Age,Occupation,City_Category,Stay_In_Current_City_Years,Marital_Status\n\
             C1,F,26-35,1,A,2,0\n",
        );

        let config = EngineConfig::with_paths(
            transactional.path().to_path_buf(),
            products.path().to_path_buf(),
            customers.path().to_path_buf(),
        );
        let mut sink = MemorySink::new();
        let report = run(&config, &mut sink).unwrap();

        assert_eq!(report.facts_emitted, 1, "P1 once, duplicate suppressed, P2 unknown");
        assert_eq!(report.dropped_unknown_product, 1);
        assert_eq!(report.transactions_read, 3);
        assert_eq!(report.duplicates_suppressed, 1);
        assert_eq!(sink.facts[0].revenue, 30.00);
        assert!(sink.closed);
    }
}
