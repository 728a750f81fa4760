//! Session logger: one log file per run in the OS data directory.
//!
//! The file is truncated at each launch, so it only holds the latest session.
//! Headless runs write `mask-studio-cli.log` in the same folder instead.
//!
//! Log location:
//!   Windows:  `%APPDATA%\MaskStudio\mask-studio.log`
//!   Linux:    `~/.local/share/MaskStudio/mask-studio.log`
//!   macOS:    `~/Library/Application Support/MaskStudio/mask-studio.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` macros anywhere in the crate.
//! Before [`init`] runs (unit tests, library embedding) the macros are no-ops
//! unless stderr echo is on.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static ECHO_STDERR: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn tag(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Path of the current session log, once [`init`] has succeeded.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Mirror every log line to stderr (headless `--verbose`).
pub fn set_echo_stderr(enabled: bool) {
    ECHO_STDERR.store(enabled, Ordering::Relaxed);
}

/// Write a raw line. I/O errors are swallowed: logging must never take the
/// app down.
pub fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
    if ECHO_STDERR.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
}

pub fn write(level: Level, msg: &str) {
    write_line(&format_line(&timestamp(), level, msg));
}

fn format_line(ts: &str, level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", ts, level.tag(), msg)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*))
    };
}

const GUI_LOG_FILE: &str = "mask-studio.log";
const CLI_LOG_FILE: &str = "mask-studio-cli.log";

/// Open the GUI session log and install the panic hook.
pub fn init() {
    init_at(&default_log_path(GUI_LOG_FILE));
}

/// Open the headless log. It sits beside the GUI log so a CLI run never
/// truncates the last GUI session.
pub fn init_headless() {
    init_at(&default_log_path(CLI_LOG_FILE));
}

/// Open (truncating) the log at `path`. Failure to open is reported on stderr
/// and otherwise ignored. Only the first successful call takes effect.
pub fn init_at(path: &Path) {
    if LOG_FILE.get().is_some() {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path);

    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.to_path_buf());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    write_line(&format!(
        "=== Mask Studio session started (unix {}) ===",
        unix_seconds().unwrap_or(0)
    ));
    write_line(&format!("Log file: {}", path.display()));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

fn default_log_path(file_name: &str) -> PathBuf {
    data_dir().join("MaskStudio").join(file_name)
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn unix_seconds() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// HH:MM:SS (UTC) within the current day.
fn timestamp() -> String {
    match unix_seconds() {
        Some(secs) => format!(
            "{:02}:{:02}:{:02}",
            (secs % 86400) / 3600,
            (secs % 3600) / 60,
            secs % 60
        ),
        None => "??:??:??".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_tags_level() {
        assert_eq!(
            format_line("01:02:03", Level::Warn, "spray density low"),
            "[01:02:03] [WARN] spray density low"
        );
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
    }

    #[test]
    fn test_cli_and_gui_logs_are_separate_files() {
        let gui = default_log_path(GUI_LOG_FILE);
        let cli = default_log_path(CLI_LOG_FILE);
        assert_ne!(gui, cli);
        assert_eq!(gui.parent(), cli.parent());
        assert!(gui.ends_with("MaskStudio/mask-studio.log"));
    }

    #[test]
    fn test_macros_are_safe_without_init() {
        log_info!("no file yet: {}", 1);
        log_err!("still fine");
    }
}
