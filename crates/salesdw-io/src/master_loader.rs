use salesdw_core::{EngineError, Product, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

const PRICE_COLUMN_CANDIDATES: [&str; 2] = ["price", "price$"];

/// A product master table sliced into consecutive partitions of at most
/// `vp` rows, plus the `Product_ID → partition_index` index the joiner
/// uses to pick a partition in O(1).
///
/// Partitions are reached through [`load`](Self::load) rather than a bare
/// public field so a future disk-resident backing store could implement
/// the same accessor without the joiner changing.
pub struct ProductPartitions {
    partitions: Vec<Vec<Product>>,
    index: HashMap<String, usize>,
}

impl ProductPartitions {
    pub fn build(products: Vec<Product>, vp: usize) -> Self {
        let vp = vp.max(1);
        let mut index = HashMap::with_capacity(products.len());
        let mut partitions = Vec::with_capacity(products.len() / vp + 1);

        for chunk in products.chunks(vp) {
            let partition_idx = partitions.len();
            for product in chunk {
                index.insert(product.product_id.clone(), partition_idx);
            }
            partitions.push(chunk.to_vec());
        }

        Self { partitions, index }
    }

    /// The partition index a given natural key lives in, if known.
    pub fn partition_of(&self, product_id: &str) -> Option<usize> {
        self.index.get(product_id).copied()
    }

    /// Load a partition's rows. Panics on an out-of-range index, which
    /// would indicate an engine bug (the joiner only ever calls this with
    /// indices it obtained from [`partition_of`](Self::partition_of)).
    pub fn load(&self, partition_index: usize) -> &[Product] {
        &self.partitions[partition_index]
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn product_count(&self) -> usize {
        self.index.len()
    }
}

/// Reads and normalizes the product master CSV: dedupes on `Product_ID`
/// (keep first), detects the price column case-insensitively against
/// `{price, price$}`, strips a leading currency symbol before parsing the
/// price, and coerces `supplierID`/`storeID` to integers (non-numeric →
/// `0`). Missing fields fall back to `"Unknown"`.
pub fn load_products(path: &Path) -> Result<Vec<Product>> {
    if !path.exists() {
        return Err(EngineError::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let price_col = headers
        .iter()
        .position(|h| PRICE_COLUMN_CANDIDATES.contains(&h.to_ascii_lowercase().as_str()))
        .ok_or_else(|| EngineError::MissingColumn("price".to_string()))?;
    let product_id_col = column(&headers, "Product_ID")?;
    let category_col = column(&headers, "Product_Category")?;
    let supplier_id_col = column(&headers, "supplierID")?;
    let supplier_name_col = column(&headers, "supplierName")?;
    let store_id_col = column(&headers, "storeID")?;
    let store_name_col = column(&headers, "storeName")?;

    let mut seen = std::collections::HashSet::new();
    let mut products = Vec::new();

    for record in reader.records() {
        let record = record?;
        let product_id = field(&record, product_id_col);
        if product_id.is_empty() || !seen.insert(product_id.clone()) {
            continue;
        }

        let price = normalize_price(&field(&record, price_col));
        products.push(Product {
            product_id,
            category: field_or_unknown(&record, category_col),
            price,
            supplier_id: parse_int_or_zero(&field(&record, supplier_id_col)),
            supplier_name: field_or_unknown(&record, supplier_name_col),
            store_id: parse_int_or_zero(&field(&record, store_id_col)),
            store_name: field_or_unknown(&record, store_name_col),
        });
    }

    info!(count = products.len(), path = %path.display(), "loaded product master");
    Ok(products)
}

/// Reads and normalizes the customer master CSV: dedupes on `Customer_ID`
/// (keep first), coerces `Marital_Status` to `0`/`1` (non-numeric → `0`),
/// and defaults missing fields to `"Unknown"`.
pub fn load_customers(path: &Path) -> Result<Vec<salesdw_core::Customer>> {
    if !path.exists() {
        return Err(EngineError::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let customer_id_col = column(&headers, "Customer_ID")?;
    let gender_col = column(&headers, "Gender")?;
    let age_col = column(&headers, "Age")?;
    let occupation_col = column(&headers, "Occupation")?;
    let city_category_col = column(&headers, "City_Category")?;
    let stay_col = column(&headers, "Stay_In_Current_City_Years")?;
    let marital_col = column(&headers, "Marital_Status")?;

    let mut seen = std::collections::HashSet::new();
    let mut customers = Vec::new();

    for record in reader.records() {
        let record = record?;
        let customer_id = field(&record, customer_id_col);
        if customer_id.is_empty() || !seen.insert(customer_id.clone()) {
            continue;
        }

        customers.push(salesdw_core::Customer {
            customer_id,
            gender: field_or_unknown(&record, gender_col),
            age: field_or_unknown(&record, age_col),
            occupation: field_or_unknown(&record, occupation_col),
            city_category: field_or_unknown(&record, city_category_col),
            stay_in_current_city_years: field_or_unknown(&record, stay_col),
            marital_status: parse_marital_status(&field(&record, marital_col)),
        });
    }

    info!(count = customers.len(), path = %path.display(), "loaded customer master");
    Ok(customers)
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| EngineError::MissingColumn(name.to_string()))
}

fn field(record: &csv::StringRecord, col: usize) -> String {
    record.get(col).unwrap_or("").trim().to_string()
}

fn field_or_unknown(record: &csv::StringRecord, col: usize) -> String {
    let value = field(record, col);
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value
    }
}

fn normalize_price(raw: &str) -> f64 {
    let stripped: String = raw.chars().filter(|c| !is_currency_symbol(*c)).collect();
    stripped.trim().parse::<f64>().unwrap_or_else(|_| {
        if !raw.is_empty() {
            warn!(raw, "unparseable price, coercing to 0.0");
        }
        0.0
    })
}

fn is_currency_symbol(c: char) -> bool {
    matches!(c, '$' | '€' | '£')
}

fn parse_int_or_zero(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}

fn parse_marital_status(raw: &str) -> u8 {
    match raw.trim() {
        "1" => 1,
        _ => 0,
    }
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
    fn detects_price_column_case_insensitively_and_strips_currency() {
        let file = write_csv(
            "Product_ID,Product_Category,Price$,supplierID,supplierName,storeID,storeName\n\
             P1,A,$12.50,1,Sn1,1,Tn1\n",
        );
        let products = load_products(file.path()).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, 12.50);
    }

    #[test]
    fn dedupes_on_product_id_keeping_first() {
        let file = write_csv(
            "Product_ID,Product_Category,price,supplierID,supplierName,storeID,storeName\n\
             P1,A,10.00,1,Sn1,1,Tn1\n\
             P1,B,99.00,2,Sn2,2,Tn2\n",
        );
        let products = load_products(file.path()).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].category, "A");
    }

    #[test]
    fn missing_price_column_is_fatal() {
        let file = write_csv(
            "Product_ID,Product_Category,supplierID,supplierName,storeID,storeName\nP1,A,1,Sn1,1,Tn1\n",
        );
        let err = load_products(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn(_)));
    }

    #[test]
    fn invalid_price_coerces_to_zero() {
        let file = write_csv(
            "Product_ID,Product_Category,price,supplierID,supplierName,storeID,storeName\n\
             P1,A,not-a-number,1,Sn1,1,Tn1\n",
        );
        let products = load_products(file.path()).unwrap();
        assert_eq!(products[0].price, 0.0);
    }

    #[test]
    fn non_numeric_supplier_and_store_ids_coerce_to_zero() {
        let file = write_csv(
            "Product_ID,Product_Category,price,supplierID,supplierName,storeID,storeName\n\
             P1,A,10.00,abc,Sn1,xyz,Tn1\n",
        );
        let products = load_products(file.path()).unwrap();
        assert_eq!(products[0].supplier_id, 0);
        assert_eq!(products[0].store_id, 0);
    }

    #[test]
    fn partitions_cap_at_vp_and_index_every_product() {
        let products: Vec<Product> = (0..1250)
            .map(|i| Product {
                product_id: format!("P{i}"),
                category: "A".to_string(),
                price: 1.0,
                supplier_id: 1,
                supplier_name: "S".to_string(),
                store_id: 1,
                store_name: "T".to_string(),
            })
            .collect();

        let partitions = ProductPartitions::build(products, 500);
        assert_eq!(partitions.partition_count(), 3);
        assert_eq!(partitions.product_count(), 1250);
        assert_eq!(partitions.load(0).len(), 500);
        assert_eq!(partitions.load(2).len(), 250);
        assert_eq!(partitions.partition_of("P600"), Some(1));
        assert_eq!(partitions.partition_of("P999999"), None);
    }

    #[test]
    fn missing_file_is_a_fatal_config_error() {
        let err = load_products(Path::new("/nonexistent/products.csv")).unwrap_err();
        assert!(matches!(err, EngineError::MissingFile(_)));
    }

    #[test]
    fn marital_status_coerces_non_numeric_to_zero() {
        let file = write_csv(
            "Customer_ID,Gender,Age,Occupation,City_Category,Stay_In_Current_City_Years,Marital_Status\n\
             C1,F,26-35,1,A,2,maybe\n",
        );
        let customers = load_customers(file.path()).unwrap();
        assert_eq!(customers[0].marital_status, 0);
    }
}
