//! Starter catalog written into empty local storage.

use storefront_core::ProductId;

use crate::product::Product;

/// Bump when the seed data changes; stored catalogs with another version are
/// replaced by the new seed on open.
pub const SEED_VERSION: &str = "6";

fn seeded(id: &str, name: &str, fabric: &str, price: u64) -> Option<Product> {
    let mut product = Product::new(ProductId::new(id).ok()?, name, price);
    product.fabric = fabric.to_string();
    Some(product)
}

/// The starter collection.
pub fn default_products() -> Vec<Product> {
    let entries = [
        ("1", "Midnight Velvet Luxury", "Velvet", "Premium Velvet", 8500, Some(7999)),
        ("2", "Royal Gold Lawn", "Lawn", "Swiss Lawn", 4500, None),
        ("3", "Crimson Rose Festivity", "Chiffon", "Pure Chiffon", 12000, Some(10500)),
        ("4", "Emerald Jacquard", "", "Jacquard", 6500, None),
        ("7", "Ivory Silk Elegance", "", "Raw Silk", 9500, None),
        ("8", "Teal Bloom Lawn", "", "Lawn", 3800, Some(3200)),
    ];

    entries
        .into_iter()
        .filter_map(|(id, name, category, fabric, price, sale)| {
            let mut product = seeded(id, name, fabric, price)?.with_category(category);
            product.sale_price = sale;
            product.description = format!("{name} in {fabric}.");
            Some(product.normalized())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_ids_are_unique() {
        let products = default_products();
        let mut ids: Vec<_> = products.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), products.len());
    }
}
