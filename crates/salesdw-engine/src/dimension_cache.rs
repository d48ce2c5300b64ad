use salesdw_core::{Customer, DateRecord, Product, Result, WarehouseSink};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::warn;

/// A single dimension's `natural-key → surrogate-key` map. Warmed once at
/// startup and then only ever grows (invariant 5: once created, a
/// surrogate key is never reassigned). Accessed exclusively from the
/// joiner thread, so it needs no internal locking.
pub struct SurrogateCache<K: Eq + Hash> {
    map: HashMap<K, i64>,
}

impl<K: Eq + Hash> SurrogateCache<K> {
    pub fn warm(pairs: Vec<(K, i64)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &K) -> Option<i64> {
        self.map.get(key).copied()
    }

    pub fn insert(&mut self, key: K, surrogate: i64) {
        self.map.insert(key, surrogate);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Owns one [`SurrogateCache`] per dimension and the lazy get-or-create
/// logic that composes it with a [`WarehouseSink`]: look up by natural
/// key, and on a miss issue the dimension's insert, cache the generated
/// key, and return it.
pub struct DimensionCaches {
    customers: SurrogateCache<String>,
    products: SurrogateCache<String>,
    suppliers: SurrogateCache<i64>,
    stores: SurrogateCache<i64>,
    dates: SurrogateCache<String>,
}

impl DimensionCaches {
    /// Warms every dimension cache from the sink's existing rows.
    pub fn warm(sink: &mut dyn WarehouseSink) -> Result<Self> {
        Ok(Self {
            customers: SurrogateCache::warm(sink.load_customer_keys()?),
            products: SurrogateCache::warm(sink.load_product_keys()?),
            suppliers: SurrogateCache::warm(sink.load_supplier_keys()?),
            stores: SurrogateCache::warm(sink.load_store_keys()?),
            dates: SurrogateCache::warm(sink.load_date_keys()?),
        })
    }

    pub fn get_or_create_supplier(
        &mut self,
        sink: &mut dyn WarehouseSink,
        supplier_id: i64,
        supplier_name: &str,
    ) -> Result<i64> {
        if let Some(key) = self.suppliers.get(&supplier_id) {
            return Ok(key);
        }
        let key = sink.insert_supplier(supplier_id, supplier_name)?;
        self.suppliers.insert(supplier_id, key);
        Ok(key)
    }

    pub fn get_or_create_store(
        &mut self,
        sink: &mut dyn WarehouseSink,
        store_id: i64,
        store_name: &str,
    ) -> Result<i64> {
        if let Some(key) = self.stores.get(&store_id) {
            return Ok(key);
        }
        let key = sink.insert_store(store_id, store_name)?;
        self.stores.insert(store_id, key);
        Ok(key)
    }

    pub fn get_or_create_product(
        &mut self,
        sink: &mut dyn WarehouseSink,
        product: &Product,
        supplier_key: i64,
        store_key: i64,
    ) -> Result<i64> {
        if let Some(key) = self.products.get(&product.product_id) {
            return Ok(key);
        }
        let key = sink.insert_product(product, supplier_key, store_key)?;
        self.products.insert(product.product_id.clone(), key);
        Ok(key)
    }

    /// Resolves the customer key for a transaction. If `customer` is
    /// `None` (the customer is absent from master data), an `"Unknown"`
    /// dimension row is created and a warning logged — the documented
    /// tolerate-don't-drop policy.
    pub fn get_or_create_customer(
        &mut self,
        sink: &mut dyn WarehouseSink,
        customer_id: &str,
        customer: Option<&Customer>,
    ) -> Result<i64> {
        if let Some(key) = self.customers.get(&customer_id.to_string()) {
            return Ok(key);
        }
        let row = match customer {
            Some(c) => c.clone(),
            None => {
                warn!(customer_id, "unknown customer, inserting Unknown dimension row");
                Customer::unknown(customer_id)
            }
        };
        let key = sink.insert_customer(&row)?;
        self.customers.insert(customer_id.to_string(), key);
        Ok(key)
    }

    pub fn get_or_create_date(
        &mut self,
        sink: &mut dyn WarehouseSink,
        date: &DateRecord,
    ) -> Result<i64> {
        if let Some(key) = self.dates.get(&date.full_date) {
            return Ok(key);
        }
        let key = sink.insert_date(date)?;
        self.dates.insert(date.full_date.clone(), key);
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdw_io::MemorySink;

    #[test]
    fn repeated_lookups_return_the_same_stable_key() {
        let mut sink = MemorySink::new();
        let mut caches = DimensionCaches::warm(&mut sink).unwrap();

        let first = caches.get_or_create_supplier(&mut sink, 1, "Sn1").unwrap();
        let second = caches.get_or_create_supplier(&mut sink, 1, "Sn1").unwrap();
        assert_eq!(first, second);
        assert_eq!(sink.suppliers.len(), 1, "only one insert should have happened");
    }

    #[test]
    fn unknown_customer_gets_an_unknown_row() {
        let mut sink = MemorySink::new();
        let mut caches = DimensionCaches::warm(&mut sink).unwrap();

        let key = caches
            .get_or_create_customer(&mut sink, "C999", None)
            .unwrap();
        let (_, stored) = sink.customers.get("C999").unwrap();
        assert_eq!(stored.gender, "Unknown");
        assert!(key > 0);
    }

    #[test]
    fn warming_from_existing_rows_avoids_reinsertion() {
        let mut sink = MemorySink::new();
        let existing_key = sink.insert_supplier(1, "Sn1").unwrap();
        let mut caches = DimensionCaches::warm(&mut sink).unwrap();

        let key = caches.get_or_create_supplier(&mut sink, 1, "Sn1").unwrap();
        assert_eq!(key, existing_key);
        assert_eq!(sink.suppliers.len(), 1);
    }
}
