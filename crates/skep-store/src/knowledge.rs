//! Waste-name classification gateway.
//!
//! The gateway owns the name-to-category mapping. The contract is a
//! deterministic lookup: the same name always resolves to the same
//! category, and names outside the table resolve to nothing, which the
//! protocol reports with the sentinel reply.

use std::collections::HashMap;

use skep_proto::Category;

use crate::error::{StoreError, StoreResult};

/// Resolves a waste-item name to its category.
pub trait ClassificationGateway: Send + Sync + std::fmt::Debug {
    /// Look up the category for a waste-item name, `None` when the
    /// name is unknown.
    fn classify(&self, waste_name: &str) -> Option<Category>;
}

/// In-memory [`ClassificationGateway`] over a fixed name table.
///
/// Names are matched exactly; one row per name, category in 1..=4.
#[derive(Debug, Default)]
pub struct KnowledgeTable {
    entries: HashMap<String, Category>,
}

impl KnowledgeTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name with its category (builder form).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidSeed` if the category is the
    /// reserved sentinel, which never denotes a real waste kind.
    pub fn with_item(mut self, name: impl Into<String>, category: Category) -> StoreResult<Self> {
        self.insert(name, category)?;
        Ok(self)
    }

    /// Add a name with its category.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidSeed` for the sentinel category.
    pub fn insert(&mut self, name: impl Into<String>, category: Category) -> StoreResult<()> {
        if category.is_sentinel() {
            return Err(StoreError::InvalidSeed {
                reason: format!("category {category} is the reserved sentinel"),
            });
        }
        self.entries.insert(name.into(), category);
        Ok(())
    }

    /// Number of known names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ClassificationGateway for KnowledgeTable {
    fn classify(&self, waste_name: &str) -> Option<Category> {
        self.entries.get(waste_name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(code: u8) -> Category {
        Category::new(code).unwrap()
    }

    #[test]
    fn classify_hits_and_misses() {
        let table = KnowledgeTable::new()
            .with_item("plastic bottle", category(1))
            .unwrap()
            .with_item("banana peel", category(3))
            .unwrap();

        assert_eq!(table.classify("plastic bottle"), Some(category(1)));
        assert_eq!(table.classify("banana peel"), Some(category(3)));
        assert_eq!(table.classify("mystery object"), None);
    }

    #[test]
    fn lookup_is_exact_match() {
        let table = KnowledgeTable::new()
            .with_item("plastic bottle", category(1))
            .unwrap();
        assert_eq!(table.classify("Plastic Bottle"), None);
        assert_eq!(table.classify("plastic bottle "), None);
    }

    #[test]
    fn rejects_sentinel_seed() {
        let result = KnowledgeTable::new().with_item("junk", Category::SENTINEL);
        assert!(matches!(result, Err(StoreError::InvalidSeed { .. })));
    }

    #[test]
    fn reseeding_a_name_overwrites_it() {
        let mut table = KnowledgeTable::new();
        table.insert("carton", category(1)).unwrap();
        table.insert("carton", category(4)).unwrap();
        assert_eq!(table.classify("carton"), Some(category(4)));
        assert_eq!(table.len(), 1);
    }
}
