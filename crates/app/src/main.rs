use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod config;
mod context;
mod pipeline;

use config::Config;
use context::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries replies only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from).or_else(Config::default_path);
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }
    let db = jizhang_storage::create_db(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    jizhang_storage::seed_default_subjects(&db, &config.ledger_id)
        .await
        .context("Failed to seed default subjects")?;

    tracing::info!(db = %db_path.display(), ledger = %config.ledger_id, "ready");

    let ledger_id = config.ledger_id.clone();
    let json_output = config.json_output;
    let ctx = AppContext::new(jizhang_storage::SqliteStore::new(db), config);

    // ── Chat loop ─────────────────────────────────────────────────────────────
    // One line in, one reply out. Blank lines are ignored.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = ctx.handle_message(&ledger_id, &line, chrono::Utc::now()).await;
        if json_output {
            println!("{}", serde_json::to_string(&reply)?);
        } else {
            println!("{}\n", reply.message);
        }
    }

    Ok(())
}
