use std::path::PathBuf;

use tracing::info;

use cxp::db::{get_connection, init_db};
use cxp::error::Result;
use cxp::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("imports"))?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    info!(data_dir = %resolved.display(), "database ready");

    println!("Initialized cxp at {}", resolved.display());
    Ok(())
}
