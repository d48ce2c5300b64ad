use salesdw_core::{EngineError, StreamBuffer, Transaction};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How many rows the producer reads before it yields briefly, giving the
/// joiner a chance to drain the buffer under contention.
const YIELD_EVERY: usize = 1_000;

/// Counts the orchestrator folds into the final run summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProducerReport {
    pub rows_read: usize,
    pub admitted: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

/// Runs the stream producer to completion: reads `path` row by row,
/// suppresses duplicate `(orderID, Product_ID)` pairs, and pushes every
/// admissible row into `buffer`. Marks `buffer`'s `producer_done` flag on
/// EOF (or on a fatal error, so the joiner is never left waiting forever).
///
/// This function owns the only two pieces of producer-local state the
/// design calls out: the CSV reader and the `seen` dedup set. It is meant
/// to be the body of the producer's OS thread.
pub fn run_producer(path: &Path, buffer: Arc<StreamBuffer>, stream_sleep: Duration) -> ProducerReport {
    let result = read_rows(path, &buffer, stream_sleep);
    buffer.mark_producer_done();
    match result {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "stream producer aborted");
            ProducerReport::default()
        }
    }
}

fn read_rows(
    path: &Path,
    buffer: &StreamBuffer,
    stream_sleep: Duration,
) -> Result<ProducerReport, EngineError> {
    if !path.exists() {
        return Err(EngineError::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let order_id_col = column(&headers, "orderID")?;
    let customer_id_col = column(&headers, "Customer_ID")?;
    let product_id_col = column(&headers, "Product_ID")?;
    let quantity_col = column(&headers, "quantity")?;
    let date_col = column(&headers, "date")?;

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut admitted = 0usize;
    let mut duplicates = 0usize;
    let mut malformed = 0usize;
    let mut rows_read = 0usize;

    for record in reader.records() {
        let record = record?;
        rows_read += 1;

        let order_id = record.get(order_id_col).unwrap_or("").trim().to_string();
        let product_id = record.get(product_id_col).unwrap_or("").trim().to_string();
        let key = (order_id.clone(), product_id.clone());

        if !seen.insert(key) {
            duplicates += 1;
        } else {
            let quantity_raw = record.get(quantity_col).unwrap_or("").trim();
            match quantity_raw.parse::<i64>() {
                Ok(quantity) if quantity > 0 => {
                    buffer.push(Transaction {
                        order_id,
                        customer_id: record.get(customer_id_col).unwrap_or("").trim().to_string(),
                        product_id,
                        quantity,
                        date: record.get(date_col).unwrap_or("").trim().to_string(),
                    });
                    admitted += 1;
                }
                _ => {
                    malformed += 1;
                    warn!(order_id = %record.get(order_id_col).unwrap_or(""), quantity = quantity_raw, "unparseable quantity, discarding row");
                }
            }
        }

        if rows_read % YIELD_EVERY == 0 {
            std::thread::sleep(stream_sleep);
        }
    }

    info!(rows_read, admitted, duplicates, malformed, path = %path.display(), "stream producer finished");
    Ok(ProducerReport {
        rows_read,
        admitted,
        duplicates,
        malformed,
    })
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, EngineError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| EngineError::MissingColumn(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn suppresses_duplicate_order_product_pairs() {
        let file = write_csv(
            "orderID,Customer_ID,Product_ID,quantity,date\n\
             O1,C1,P1,2,2017-01-01\n\
             O1,C1,P1,2,2017-01-01\n",
        );
        let buffer = Arc::new(StreamBuffer::new());
        let report = run_producer(file.path(), buffer.clone(), Duration::from_micros(1));
        assert!(buffer.producer_done());
        assert_eq!(report.duplicates, 1);
        let drained = buffer.drain_up_to(10);
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn discards_rows_with_unparseable_quantity() {
        let file = write_csv(
            "orderID,Customer_ID,Product_ID,quantity,date\n\
             O1,C1,P1,not-a-number,2017-01-01\n\
             O2,C1,P2,3,2017-01-01\n",
        );
        let buffer = Arc::new(StreamBuffer::new());
        run_producer(file.path(), buffer.clone(), Duration::from_micros(1));
        let drained = buffer.drain_up_to(10);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].order_id, "O2");
    }

    #[test]
    fn missing_file_still_marks_producer_done() {
        let buffer = Arc::new(StreamBuffer::new());
        run_producer(
            Path::new("/nonexistent/stream.csv"),
            buffer.clone(),
            Duration::from_micros(1),
        );
        assert!(buffer.producer_done());
        assert!(buffer.drain_up_to(10).is_empty());
    }
}
