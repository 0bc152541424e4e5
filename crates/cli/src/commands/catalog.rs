//! `shopwright catalog`: print the seeded catalog.

use shopwright_config::AppConfig;
use shopwright_core::catalog::CatalogStore;
use shopwright_store::InMemoryCatalog;

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = InMemoryCatalog::seeded(&config.store);

    let categories = store.list_categories().await?;
    let pages = store.list_info_pages().await?;

    if json {
        let mut products = Vec::new();
        for category in &categories {
            products.extend(store.list_products(category.id).await?);
        }
        let doc = serde_json::json!({
            "store": store.name(),
            "categories": categories,
            "products": products,
            "info_pages": pages,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("📦 Catalog ({})", store.name());
    println!();
    println!("  Categories:");
    for category in &categories {
        let count = store.list_products(category.id).await?.len();
        println!("    {:>3}  {:<20} {count} product(s)", category.id, category.name);
    }
    println!();
    println!("  Info pages:");
    for page in &pages {
        let first_line = page.description.lines().next().unwrap_or_default();
        println!("    {:<10} {first_line}", page.name);
    }

    Ok(())
}
