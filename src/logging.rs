//! Tracing setup. Logs go to stderr; with `debug_mode` they are also
//! appended to one file per day under the data directory.

use crate::config::get_data_dir;
use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub fn log_dir() -> PathBuf {
    get_data_dir().join("logs")
}

/// `<dir>/sol_YYYYMMDD.log`
pub fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("sol_{}.log", date.format("%Y%m%d")))
}

pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber. `RUST_LOG` overrides the level.
pub fn init_tracing(debug_mode: bool) {
    let default = if debug_mode { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let mut open_error = None;
    let file_layer = if debug_mode {
        let path = log_file_path(&log_dir(), Local::now().date_naive());
        match open_log_file(&path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            ),
            Err(e) => {
                open_error = Some((path, e));
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(file_layer)
        .init();

    if let Some((path, e)) = open_error {
        warn!("cannot open log file {}: {}; logging to stderr only", path.display(), e);
    }
}
