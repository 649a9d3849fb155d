//! Board server lifecycle: `planpilot serve` and `planpilot init-db`.

use std::path::PathBuf;

use anyhow::Result;

use planpilot::board::db::BoardDb;
use planpilot::config::{ServeArgs, ServerSettings, load_db_path};
use planpilot::ui::icons;

pub async fn cmd_serve(settings: ServerSettings) -> Result<()> {
    if settings.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set, signing tokens with the built-in dev secret");
    }
    planpilot::board::start_server(settings.server).await
}

pub fn cmd_init_db(db_path: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let args = ServeArgs {
        db_path,
        config,
        ..Default::default()
    };
    let path = load_db_path(&args)?;
    BoardDb::new(&path)?;
    println!(
        "{} Database ready at {}",
        icons::CHECK,
        console::style(path.display()).bold()
    );
    Ok(())
}
