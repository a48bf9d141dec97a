/// Daily log file output
///
/// Lines go to `logs/device_tracker_<YYYY-MM-DD>.log` through a buffered
/// writer that rolls over when the date changes.
use super::config::get_logger_config;
use crate::paths::get_logs_directory;
use chrono::Local;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

struct FileLogState {
    date: String,
    writer: BufWriter<File>,
}

static FILE_LOGGER: Lazy<Mutex<Option<FileLogState>>> = Lazy::new(|| Mutex::new(None));

fn open_for_date(date: &str) -> Option<FileLogState> {
    let dir = get_logs_directory();
    if std::fs::create_dir_all(&dir).is_err() {
        return None;
    }
    let path = dir.join(format!("device_tracker_{}.log", date));
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(FileLogState {
            date: date.to_string(),
            writer: BufWriter::new(file),
        }),
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
            None
        }
    }
}

pub fn init_file_logging() {
    if !get_logger_config().file_logging_enabled {
        return;
    }
    let date = Local::now().format("%Y-%m-%d").to_string();
    *FILE_LOGGER.lock() = open_for_date(&date);
}

/// Append one plain-text line; a no-op until `init_file_logging` succeeded
pub fn write_to_file(line: &str) {
    let mut guard = FILE_LOGGER.lock();
    let today = Local::now().format("%Y-%m-%d").to_string();

    let needs_rotation = matches!(guard.as_ref(), Some(state) if state.date != today);
    if needs_rotation {
        if let Some(state) = guard.as_mut() {
            let _ = state.writer.flush();
        }
        *guard = open_for_date(&today);
    }

    if let Some(state) = guard.as_mut() {
        let _ = writeln!(state.writer, "{}", line);
    }
}

pub fn flush_file_logging() {
    if let Some(state) = FILE_LOGGER.lock().as_mut() {
        let _ = state.writer.flush();
    }
}
