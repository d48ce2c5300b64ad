use postgres::{Client, NoTls};
use salesdw_core::{Customer, DateRecord, EngineError, Fact, Product, Result, WarehouseSink};
use tracing::info;

/// A `WarehouseSink` backed by a Postgres connection.
///
/// Assumes the star schema (`DimCustomer`, `DimProduct`, `DimSupplier`,
/// `DimStore`, `DimDate`, `FactSales`) has already been bootstrapped by an
/// external collaborator; this sink only inserts rows and relies on each
/// table's `SERIAL`/`IDENTITY` primary key plus a `RETURNING` clause for
/// the generated surrogate key.
///
/// Writes for a batch run inside a real transaction: the first insert
/// after open (or after the previous commit) issues `BEGIN`, and
/// [`commit`](WarehouseSink::commit) issues `COMMIT`. This gives
/// `COMMIT_BATCH` the atomicity the design calls for — a sink error
/// partway through a batch leaves nothing from that batch durable, while
/// everything from prior commits stays put.
pub struct PostgresSink {
    client: Client,
    in_transaction: bool,
}

impl PostgresSink {
    pub fn connect(url: &str) -> Result<Self> {
        let client = Client::connect(url, NoTls)
            .map_err(|e| EngineError::Sink(format!("connect failed: {e}")))?;
        info!("connected to postgres warehouse");
        Ok(Self {
            client,
            in_transaction: false,
        })
    }

    fn sink_err(context: &str, e: postgres::Error) -> EngineError {
        EngineError::Sink(format!("{context}: {e}"))
    }

    /// Opens a transaction if one isn't already open. Called before every
    /// insert so the warmup `load_*_keys` scans (which run before any
    /// write) never start one.
    fn ensure_transaction(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.client
                .batch_execute("BEGIN")
                .map_err(|e| Self::sink_err("begin transaction", e))?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl WarehouseSink for PostgresSink {
    fn load_customer_keys(&mut self) -> Result<Vec<(String, i64)>> {
        let rows = self
            .client
            .query("SELECT customer_id, customer_key FROM dim_customer", &[])
            .map_err(|e| Self::sink_err("load_customer_keys", e))?;
        Ok(rows.iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    fn load_product_keys(&mut self) -> Result<Vec<(String, i64)>> {
        let rows = self
            .client
            .query("SELECT product_id, product_key FROM dim_product", &[])
            .map_err(|e| Self::sink_err("load_product_keys", e))?;
        Ok(rows.iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    fn load_supplier_keys(&mut self) -> Result<Vec<(i64, i64)>> {
        let rows = self
            .client
            .query("SELECT supplier_id, supplier_key FROM dim_supplier", &[])
            .map_err(|e| Self::sink_err("load_supplier_keys", e))?;
        Ok(rows.iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    fn load_store_keys(&mut self) -> Result<Vec<(i64, i64)>> {
        let rows = self
            .client
            .query("SELECT store_id, store_key FROM dim_store", &[])
            .map_err(|e| Self::sink_err("load_store_keys", e))?;
        Ok(rows.iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    fn load_date_keys(&mut self) -> Result<Vec<(String, i64)>> {
        let rows = self
            .client
            .query("SELECT full_date, date_key FROM dim_date", &[])
            .map_err(|e| Self::sink_err("load_date_keys", e))?;
        Ok(rows
            .iter()
            .map(|r| (r.get::<_, chrono::NaiveDate>(0).to_string(), r.get(1)))
            .collect())
    }

    fn insert_customer(&mut self, customer: &Customer) -> Result<i64> {
        self.ensure_transaction()?;
        let row = self
            .client
            .query_one(
                "INSERT INTO dim_customer \
                 (customer_id, gender, age, occupation, city_category, stay_in_current_city_years, marital_status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING customer_key",
                &[
                    &customer.customer_id,
                    &customer.gender,
                    &customer.age,
                    &customer.occupation,
                    &customer.city_category,
                    &customer.stay_in_current_city_years,
                    &(customer.marital_status as i16),
                ],
            )
            .map_err(|e| Self::sink_err("insert_customer", e))?;
        Ok(row.get(0))
    }

    fn insert_supplier(&mut self, supplier_id: i64, supplier_name: &str) -> Result<i64> {
        self.ensure_transaction()?;
        let row = self
            .client
            .query_one(
                "INSERT INTO dim_supplier (supplier_id, supplier_name) VALUES ($1, $2) \
                 RETURNING supplier_key",
                &[&supplier_id, &supplier_name],
            )
            .map_err(|e| Self::sink_err("insert_supplier", e))?;
        Ok(row.get(0))
    }

    fn insert_store(&mut self, store_id: i64, store_name: &str) -> Result<i64> {
        self.ensure_transaction()?;
        let row = self
            .client
            .query_one(
                "INSERT INTO dim_store (store_id, store_name) VALUES ($1, $2) \
                 RETURNING store_key",
                &[&store_id, &store_name],
            )
            .map_err(|e| Self::sink_err("insert_store", e))?;
        Ok(row.get(0))
    }

    fn insert_product(
        &mut self,
        product: &Product,
        supplier_key: i64,
        store_key: i64,
    ) -> Result<i64> {
        self.ensure_transaction()?;
        let row = self
            .client
            .query_one(
                "INSERT INTO dim_product \
                 (product_id, product_category, price, supplier_key, store_key) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING product_key",
                &[
                    &product.product_id,
                    &product.category,
                    &product.price,
                    &supplier_key,
                    &store_key,
                ],
            )
            .map_err(|e| Self::sink_err("insert_product", e))?;
        Ok(row.get(0))
    }

    fn insert_date(&mut self, date: &DateRecord) -> Result<i64> {
        self.ensure_transaction()?;
        let full_date: chrono::NaiveDate = chrono::NaiveDate::parse_from_str(&date.full_date, "%Y-%m-%d")
            .map_err(|e| EngineError::Sink(format!("invalid derived date {}: {e}", date.full_date)))?;
        let row = self
            .client
            .query_one(
                "INSERT INTO dim_date \
                 (full_date, day, month, month_name, quarter, year, week, weekday, season) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING date_key",
                &[
                    &full_date,
                    &(date.day as i32),
                    &(date.month as i32),
                    &date.month_name,
                    &(date.quarter as i16),
                    &date.year,
                    &(date.week as i32),
                    &date.weekday,
                    &date.season,
                ],
            )
            .map_err(|e| Self::sink_err("insert_date", e))?;
        Ok(row.get(0))
    }

    fn insert_fact(&mut self, fact: &Fact) -> Result<()> {
        self.ensure_transaction()?;
        self.client
            .execute(
                "INSERT INTO fact_sales \
                 (customer_key, product_key, supplier_key, store_key, date_key, order_id, quantity, revenue) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &fact.customer_key,
                    &fact.product_key,
                    &fact.supplier_key,
                    &fact.store_key,
                    &fact.date_key,
                    &fact.order_id,
                    &fact.quantity,
                    &fact.revenue,
                ],
            )
            .map_err(|e| Self::sink_err("insert_fact", e))?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.client
                .batch_execute("COMMIT")
                .map_err(|e| Self::sink_err("commit transaction", e))?;
            self.in_transaction = false;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // A caller that errors mid-batch won't have called `commit`; don't
        // leave the transaction dangling open for the `Client`'s drop to
        // silently roll back.
        self.commit()
    }
}
