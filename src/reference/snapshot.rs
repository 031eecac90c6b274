//! A read-only copy of the reference data, taken once per upload.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::{
    Error,
    product::{Product, ProductId, get_all_products},
    reference::{ReferenceCategory, ReferenceCode, ReferenceId, ReferenceRecord, list_references},
};

/// Resolves the codes used in uploaded files to reference records.
pub trait ReferenceLookup {
    /// Find the record in `category` whose code is exactly `code`.
    fn find(&self, category: ReferenceCategory, code: &str) -> Option<&ReferenceRecord>;

    /// Find the product with the ID `product_id`.
    fn product(&self, product_id: ProductId) -> Option<&Product>;
}

/// All reference records and products, loaded in one go.
///
/// The snapshot is never written to, so it can be shared by every row of an
/// upload without re-querying the database.
#[derive(Debug, Default, Clone)]
pub struct ReferenceData {
    by_code: HashMap<ReferenceCategory, HashMap<String, ReferenceRecord>>,
    code_by_id: HashMap<(ReferenceCategory, ReferenceId), ReferenceCode>,
    products: HashMap<ProductId, Product>,
}

impl ReferenceData {
    /// Load every reference category and product from the database.
    pub fn load(connection: &Connection) -> Result<Self, Error> {
        let mut snapshot = Self::default();

        for category in ReferenceCategory::ALL {
            for record in list_references(category, connection)? {
                snapshot.insert(category, record);
            }
        }

        for product in get_all_products(connection)? {
            snapshot.insert_product(product);
        }

        tracing::debug!(
            "Loaded reference data snapshot with {} codes and {} products",
            snapshot.code_by_id.len(),
            snapshot.products.len()
        );

        Ok(snapshot)
    }

    /// Add `record` to the snapshot.
    pub fn insert(&mut self, category: ReferenceCategory, record: ReferenceRecord) {
        self.code_by_id
            .insert((category, record.id), record.code.clone());
        self.by_code
            .entry(category)
            .or_default()
            .insert(record.code.to_string(), record);
    }

    /// Add `product` to the snapshot.
    pub fn insert_product(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    /// The code of the record with `id` in `category`, if any.
    pub fn code_for(&self, category: ReferenceCategory, id: ReferenceId) -> Option<&ReferenceCode> {
        self.code_by_id.get(&(category, id))
    }
}

impl ReferenceLookup for ReferenceData {
    fn find(&self, category: ReferenceCategory, code: &str) -> Option<&ReferenceRecord> {
        self.by_code
            .get(&category)
            .and_then(|records| records.get(code))
    }

    fn product(&self, product_id: ProductId) -> Option<&Product> {
        self.products.get(&product_id)
    }
}
