//! Static catalog shown in preview mode.
//!
//! Used when the remote store is not configured, and by `aq-cli seed` to
//! populate a fresh project.

use crate::types::{Money, Product, ProductDraft, ProductId, ProductStatus};

struct SampleRow {
    name: &'static str,
    category: &'static str,
    gender: &'static str,
    price: i64,
    stock: i64,
    status: ProductStatus,
    note: &'static str,
}

const ROWS: [SampleRow; 5] = [
    SampleRow {
        name: "Red Albino",
        category: "Albino",
        gender: "Male",
        price: 600,
        stock: 5,
        status: ProductStatus::Available,
        note: "Best seller!",
    },
    SampleRow {
        name: "Golden Fantail",
        category: "Fantail",
        gender: "Female",
        price: 450,
        stock: 3,
        status: ProductStatus::Available,
        note: "For breeding",
    },
    SampleRow {
        name: "Blue Snakeskin",
        category: "Snakeskin",
        gender: "Pair",
        price: 1200,
        stock: 2,
        status: ProductStatus::Available,
        note: "Limited",
    },
    SampleRow {
        name: "Moscow Blue",
        category: "Blue",
        gender: "Male",
        price: 800,
        stock: 8,
        status: ProductStatus::Available,
        note: "",
    },
    SampleRow {
        name: "Red Tuxedo",
        category: "Tuxedo",
        gender: "Female",
        price: 550,
        stock: 0,
        status: ProductStatus::Sold,
        note: "Sold out",
    },
];

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// The sample products, ids 1 through 5.
#[must_use]
pub fn catalog() -> Vec<Product> {
    (1..)
        .zip(ROWS.iter())
        .map(|(id, row)| Product {
            id: ProductId::new(id),
            name: row.name.to_string(),
            category: non_empty(row.category),
            gender: non_empty(row.gender),
            price: Money::new(row.price),
            stock: row.stock,
            status: row.status,
            image_url: None,
            note: non_empty(row.note),
            created_at: None,
        })
        .collect()
}

/// The sample products as insert payloads (no ids).
#[must_use]
pub fn drafts() -> Vec<ProductDraft> {
    catalog()
        .into_iter()
        .map(|p| ProductDraft {
            name: p.name,
            category: p.category,
            gender: p.gender,
            price: p.price,
            stock: p.stock,
            image_url: p.image_url,
            status: p.status,
            note: p.note,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_one_sold_product() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 5);
        let visible = catalog
            .iter()
            .filter(|p| p.status.is_storefront_visible())
            .count();
        assert_eq!(visible, 4);
    }

    #[test]
    fn test_drafts_match_catalog() {
        assert_eq!(drafts().len(), catalog().len());
        assert!(drafts().iter().all(|d| !d.price.is_zero()));
    }
}
