//! Categories and the ordered category → seed URL mapping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named grouping with one seed URL to crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category name, used to tag output records.
    pub name: String,

    /// Seed URL for the category's listing pages.
    pub seed_url: String,
}

impl Category {
    /// Create a new category.
    pub fn new(name: impl Into<String>, seed_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed_url: seed_url.into(),
        }
    }
}

/// Ordered mapping of category name → seed URL.
///
/// Iteration order is part of the contract: categories are crawled in
/// the order the caller supplied them, and output records follow that
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryMap(IndexMap<String, String>);

impl CategoryMap {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category, builder-style.
    pub fn with(mut self, name: impl Into<String>, seed_url: impl Into<String>) -> Self {
        self.0.insert(name.into(), seed_url.into());
        self
    }

    /// Add a category.
    pub fn insert(&mut self, name: impl Into<String>, seed_url: impl Into<String>) {
        self.0.insert(name.into(), seed_url.into());
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no categories are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate categories in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.0
            .iter()
            .map(|(name, url)| Category::new(name.clone(), url.clone()))
    }
}

impl<N: Into<String>, U: Into<String>> FromIterator<(N, U)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (N, U)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, u)| (n.into(), u.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_order_preserved() {
        let map = CategoryMap::new()
            .with("tech", "https://example.com/tech")
            .with("social", "https://example.com/social")
            .with("arts", "https://example.com/arts");

        let names: Vec<String> = map.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["tech", "social", "arts"]);
    }

    #[test]
    fn test_duplicate_name_replaces_url_keeps_position() {
        let map = CategoryMap::new()
            .with("tech", "https://example.com/old")
            .with("social", "https://example.com/social")
            .with("tech", "https://example.com/new");

        assert_eq!(map.len(), 2);
        let first = map.iter().next().unwrap();
        assert_eq!(first.name, "tech");
        assert_eq!(first.seed_url, "https://example.com/new");
    }
}
