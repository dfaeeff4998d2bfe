use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use futures::future::BoxFuture;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use vitrine_core::catalog::{ComboQuery, ComboReport, LookupEntry, Product, ProductLookupReport};
use vitrine_core::error::{Result, VitrineError};
use vitrine_core::traits::Catalog;

use crate::combo::{filter_combo, ComboPolicy};
use crate::schema;
use crate::seed::{bundled_fixture, NewProduct};

fn db_err(e: rusqlite::Error) -> VitrineError {
    VitrineError::Database(e.to_string())
}

/// SQLite-backed product catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    policy: ComboPolicy,
}

impl SqliteCatalog {
    /// Open or create a catalog database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VitrineError::Database(format!("Failed to create db directory: {}", e))
            })?;
        }

        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;
        schema::init(&conn)?;

        debug!(path = %path.display(), "Catalog opened");
        Ok(Self {
            conn: Mutex::new(conn),
            policy: ComboPolicy::default(),
        })
    }

    /// Open an empty in-memory catalog (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            policy: ComboPolicy::default(),
        })
    }

    /// Price bounds used by the `budget` and `premium` combo filters.
    pub fn with_policy(mut self, policy: ComboPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VitrineError::Database(e.to_string()))
    }

    /// Insert products, creating their tags. A product whose name already
    /// exists is updated in place and gains any new tags.
    pub fn insert_products(&self, products: &[NewProduct]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        for p in products {
            tx.execute(
                "INSERT INTO products (name, category, brand, price, stock_quantity, min_stock_level)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(name) DO UPDATE SET
                    category = excluded.category,
                    brand = excluded.brand,
                    price = excluded.price,
                    stock_quantity = excluded.stock_quantity,
                    min_stock_level = excluded.min_stock_level",
                params![p.name, p.category, p.brand, p.price, p.stock_quantity, p.min_stock_level],
            )
            .map_err(db_err)?;
            let product_id: i64 = tx
                .query_row("SELECT id FROM products WHERE name = ?1", params![p.name], |row| {
                    row.get(0)
                })
                .map_err(db_err)?;

            for tag in &p.tags {
                tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![tag])
                    .map_err(db_err)?;
                tx.execute(
                    "INSERT OR IGNORE INTO product_tags (product_id, tag_id)
                     SELECT ?1, id FROM tags WHERE name = ?2",
                    params![product_id, tag],
                )
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        debug!(count = products.len(), "Inserted products");
        Ok(products.len())
    }

    /// Remove every product and tag.
    pub fn reset(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "DELETE FROM product_tags;
             DELETE FROM products;
             DELETE FROM tags;",
        )
        .map_err(db_err)?;
        info!("Catalog reset");
        Ok(())
    }

    pub fn product_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.product_count()? == 0)
    }

    /// Load the bundled fixture if the catalog has no products.
    /// Returns the number of products inserted.
    pub fn seed_if_empty(&self) -> Result<usize> {
        if !self.is_empty()? {
            return Ok(0);
        }
        let inserted = self.insert_products(&bundled_fixture()?)?;
        info!(products = inserted, "Seeded empty catalog");
        Ok(inserted)
    }

    /// Every product with its tags, in insertion order.
    pub fn load_all_products(&self) -> Result<Vec<Product>> {
        let conn = self.lock()?;
        let mut tags = tags_by_product(&conn)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, category, brand, price, stock_quantity, min_stock_level
                 FROM products ORDER BY id",
            )
            .map_err(db_err)?;
        let products = stmt
            .query_map([], product_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        Ok(products
            .into_iter()
            .map(|mut p| {
                p.tags = tags.remove(&p.id).unwrap_or_default();
                p
            })
            .collect())
    }

    /// Exact, case-sensitive name match.
    pub fn product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let conn = self.lock()?;
        find_by_name(&conn, name)
    }

    fn tag_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT name FROM tags ORDER BY name")
            .map_err(db_err)?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(db_err)?;
        Ok(names)
    }

    fn product_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT name FROM products ORDER BY id")
            .map_err(db_err)?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(db_err)?;
        Ok(names)
    }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        brand: row.get(3)?,
        price: row.get(4)?,
        stock_quantity: row.get(5)?,
        min_stock_level: row.get(6)?,
        tags: Vec::new(),
    })
}

fn tags_by_product(conn: &Connection) -> Result<HashMap<i64, Vec<String>>> {
    let mut stmt = conn
        .prepare(
            "SELECT pt.product_id, t.name
             FROM product_tags pt JOIN tags t ON t.id = pt.tag_id
             ORDER BY pt.rowid",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
        .map_err(db_err)?;

    let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
    for row in rows {
        let (product_id, name) = row.map_err(db_err)?;
        tags.entry(product_id).or_default().push(name);
    }
    Ok(tags)
}

fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Product>> {
    let product = conn
        .query_row(
            "SELECT id, name, category, brand, price, stock_quantity, min_stock_level
             FROM products WHERE name = ?1",
            params![name],
            product_from_row,
        )
        .optional()
        .map_err(db_err)?;

    let Some(mut product) = product else {
        return Ok(None);
    };
    let mut stmt = conn
        .prepare(
            "SELECT t.name FROM product_tags pt JOIN tags t ON t.id = pt.tag_id
             WHERE pt.product_id = ?1 ORDER BY pt.rowid",
        )
        .map_err(db_err)?;
    product.tags = stmt
        .query_map(params![product.id], |row| row.get(0))
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(db_err)?;
    Ok(Some(product))
}

impl Catalog for SqliteCatalog {
    fn lookup_products(&self, names: Vec<String>) -> BoxFuture<'_, Result<ProductLookupReport>> {
        Box::pin(async move {
            let conn = self.lock()?;
            let mut entries = Vec::with_capacity(names.len());
            for name in &names {
                let entry = match find_by_name(&conn, name)? {
                    Some(product) => LookupEntry::Found { product },
                    None => LookupEntry::NotFound { name: name.clone() },
                };
                entries.push(entry);
            }
            Ok(ProductLookupReport {
                requested: names,
                entries,
            })
        })
    }

    fn search_combo(&self, query: ComboQuery) -> BoxFuture<'_, Result<ComboReport>> {
        Box::pin(async move {
            let products = self.load_all_products()?;
            let known_tags = self.tag_names()?;
            Ok(filter_combo(products, &known_tags, &query, &self.policy))
        })
    }

    fn all_tags(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move { self.tag_names() })
    }

    fn all_product_names(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move { self.product_names() })
    }
}
