use salesdw_core::{Customer, DateRecord, Fact, Product, Result, WarehouseSink};
use std::collections::HashMap;

/// An in-memory `WarehouseSink`, used by the CLI's `--dry-run` mode and by
/// the engine's own integration tests. Surrogate keys are assigned from
/// monotonically increasing counters, one per dimension, mirroring what a
/// real warehouse's generated primary keys would look like.
#[derive(Default)]
pub struct MemorySink {
    next_customer_key: i64,
    next_supplier_key: i64,
    next_store_key: i64,
    next_product_key: i64,
    next_date_key: i64,

    pub customers: HashMap<String, (i64, Customer)>,
    pub suppliers: HashMap<i64, (i64, String)>,
    pub stores: HashMap<i64, (i64, String)>,
    pub products: HashMap<String, (i64, Product, i64, i64)>,
    pub dates: HashMap<String, (i64, DateRecord)>,
    pub facts: Vec<Fact>,

    pub commit_count: usize,
    pub closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WarehouseSink for MemorySink {
    fn load_customer_keys(&mut self) -> Result<Vec<(String, i64)>> {
        Ok(self
            .customers
            .iter()
            .map(|(k, (key, _))| (k.clone(), *key))
            .collect())
    }

    fn load_product_keys(&mut self) -> Result<Vec<(String, i64)>> {
        Ok(self
            .products
            .iter()
            .map(|(k, (key, ..))| (k.clone(), *key))
            .collect())
    }

    fn load_supplier_keys(&mut self) -> Result<Vec<(i64, i64)>> {
        Ok(self
            .suppliers
            .iter()
            .map(|(k, (key, _))| (*k, *key))
            .collect())
    }

    fn load_store_keys(&mut self) -> Result<Vec<(i64, i64)>> {
        Ok(self.stores.iter().map(|(k, (key, _))| (*k, *key)).collect())
    }

    fn load_date_keys(&mut self) -> Result<Vec<(String, i64)>> {
        Ok(self
            .dates
            .iter()
            .map(|(k, (key, _))| (k.clone(), *key))
            .collect())
    }

    fn insert_customer(&mut self, customer: &Customer) -> Result<i64> {
        self.next_customer_key += 1;
        let key = self.next_customer_key;
        self.customers
            .insert(customer.customer_id.clone(), (key, customer.clone()));
        Ok(key)
    }

    fn insert_supplier(&mut self, supplier_id: i64, supplier_name: &str) -> Result<i64> {
        self.next_supplier_key += 1;
        let key = self.next_supplier_key;
        self.suppliers
            .insert(supplier_id, (key, supplier_name.to_string()));
        Ok(key)
    }

    fn insert_store(&mut self, store_id: i64, store_name: &str) -> Result<i64> {
        self.next_store_key += 1;
        let key = self.next_store_key;
        self.stores.insert(store_id, (key, store_name.to_string()));
        Ok(key)
    }

    fn insert_product(
        &mut self,
        product: &Product,
        supplier_key: i64,
        store_key: i64,
    ) -> Result<i64> {
        self.next_product_key += 1;
        let key = self.next_product_key;
        self.products.insert(
            product.product_id.clone(),
            (key, product.clone(), supplier_key, store_key),
        );
        Ok(key)
    }

    fn insert_date(&mut self, date: &DateRecord) -> Result<i64> {
        self.next_date_key += 1;
        let key = self.next_date_key;
        self.dates.insert(date.full_date.clone(), (key, date.clone()));
        Ok(key)
    }

    fn insert_fact(&mut self, fact: &Fact) -> Result<()> {
        self.facts.push(fact.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commit_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
