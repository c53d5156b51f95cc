use std::env;
use std::fs;

use anyhow::{anyhow, Result};
use ftail::Ftail;
use log::LevelFilter;

const LOGS_DIR: &str = ".logs";
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Console gets the run narrative (the job usually runs under cron, which
/// captures stdout); the file keeps per-item debug detail.
pub fn init_logger() -> Result<()> {
    let home = env::home_dir().ok_or_else(|| anyhow!("Could not determine $HOME"))?;
    let logs_path = home.join(LOGS_DIR).join(PKG_NAME);
    let logs_file = logs_path.join(format!("{PKG_NAME}.log"));

    fs::create_dir_all(&logs_path)
        .map_err(|e| anyhow!("Could not create logs dir at {:?}: {e}", logs_path))?;

    Ftail::new()
        .console(LevelFilter::Info)
        .single_file(&logs_file, true, LevelFilter::Debug)
        .init()
        .map_err(|e| anyhow!("Could not initialize logger: {e}"))
}
