mod backup;
mod config;
mod db;
mod error;
mod models;
mod run;

use anyhow::Result;
use env_logger::Env;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = config::Config::from_env()?;
    log::debug!("Resolved configuration: {config:?}");

    let mut db = db::Database::connect(&config.storage)?;
    let reconciler = backup::CsvReconciler::new(config.csv_path);

    // The CSV backup is the source of truth at startup.
    let restored = reconciler.import(&mut db, None);
    log::info!("Startup import restored {restored} expense(s)");
    db.reset_id_sequence();

    run::as_cli(&args, &mut db, &reconciler)
}
