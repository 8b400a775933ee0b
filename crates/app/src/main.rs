use anyhow::Context;

use storefront_app::{Storefront, StorefrontConfig};
use storefront_catalog::CatalogQuery;

fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let config = StorefrontConfig::from_env();
    tracing::info!(
        data_dir = %config.data_dir.display(),
        storage = ?config.storage,
        catalog = ?config.catalog,
        "starting storefront"
    );

    let storefront = Storefront::init(config).context("failed to start storefront")?;

    let listing = storefront
        .catalog()
        .get_all(&CatalogQuery::all().limit(8))
        .context("failed to load products")?;
    for product in &listing {
        tracing::info!(
            product_id = %product.id,
            name = %product.name,
            price = product.effective_price(),
            on_sale = product.is_on_sale(),
            "listed"
        );
    }

    let cart = storefront.cart();
    tracing::info!(
        lines = cart.lines().len(),
        items = cart.item_count(),
        total = cart.cart_total(),
        "restored cart"
    );

    storefront.dispose();
    Ok(())
}
