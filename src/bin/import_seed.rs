//! Loads the seed JSON file into `approved_businesses`, skipping slugs that are
//! already listed.

use dfw_viet_biz::config::AppConfig;
use dfw_viet_biz::database::Database;
use dfw_viet_biz::models::NewBusiness;
use dfw_viet_biz::seed::SeedFile;

const BATCH_SIZE: usize = 50;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    let seed = SeedFile::new(&config.seed_path);
    let records = seed.load().await?;
    log::info!("Read {} seed businesses from {}", records.len(), seed.path().display());

    let db = Database::connect(&config.database_url).await?;
    let mut known = db.existing_slugs().await?;

    let mut fresh: Vec<NewBusiness> = Vec::new();
    let mut skipped = 0;
    for record in records {
        let business = record.into_new_business();
        if known.insert(business.slug.clone()) {
            fresh.push(business);
        } else {
            skipped += 1;
        }
    }

    let mut imported = 0;
    while !fresh.is_empty() {
        let rest = fresh.split_off(fresh.len().min(BATCH_SIZE));
        let batch = std::mem::replace(&mut fresh, rest);
        imported += db.insert_businesses(batch).await?;
        log::info!("Imported {imported} businesses so far");
    }

    log::info!("Seed import finished: {imported} imported, {skipped} already present");
    Ok(())
}
