use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::thread;

use crate::config::AppConfig;

/// One queued line for a domain log file
struct LogEntry {
    domain: String,
    message: String,
    timestamp: String,
}

lazy_static::lazy_static! {
    static ref LOG_TX: Mutex<Option<mpsc::Sender<LogEntry>>> = Mutex::new(None);
    static ref LOG_DIR_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// File name and line prefix for a domain log
fn domain_target(domain: &str) -> (&'static str, &'static str) {
    match domain {
        "audit" => ("audit.log", "[AUDIT]"),
        "convert" => ("convert.log", "[CONVERT]"),
        "crash" => ("crash.log", "[CRASH]"),
        _ => ("custom.log", ""),
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the `log` backend: terminal output, plus `<log_dir>/logs/app.log`,
/// the domain logs and the crash hook when a log directory is configured.
pub fn init_logger(config: &AppConfig) -> io::Result<()> {
    let level = if config.verbose_logging {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(dir) = &config.log_dir {
        let log_dir = dir.join("logs");
        fs::create_dir_all(&log_dir)?;
        let file = open_append(&log_dir.join("app.log"))?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }

    CombinedLogger::init(loggers).map_err(io::Error::other)?;

    if let Some(dir) = &config.log_dir {
        init_log_dir(dir.clone());
        setup_panic_hook();
    }
    Ok(())
}

/// Remember `path` for crash reports and start the thread that appends
/// queued domain entries under `<path>/logs`.
pub fn init_log_dir(path: PathBuf) {
    if let Ok(mut dir) = LOG_DIR_PATH.lock() {
        *dir = Some(path.clone());
    }

    let (tx, rx) = mpsc::channel::<LogEntry>();

    if let Ok(mut global_tx) = LOG_TX.lock() {
        *global_tx = Some(tx);
    }

    thread::spawn(move || {
        let mut file_cache: HashMap<&'static str, File> = HashMap::new();
        let log_dir = path.join("logs");

        if !log_dir.exists() {
            let _ = fs::create_dir_all(&log_dir);
        }

        while let Ok(entry) = rx.recv() {
            let (filename, prefix) = domain_target(&entry.domain);

            if !file_cache.contains_key(filename) {
                match open_append(&log_dir.join(filename)) {
                    Ok(file) => {
                        file_cache.insert(filename, file);
                    }
                    Err(e) => {
                        eprintln!("Failed to open {}: {}", filename, e);
                        continue;
                    }
                }
            }
            let Some(file) = file_cache.get_mut(filename) else {
                continue;
            };

            let message = if !prefix.is_empty() && !entry.message.contains(prefix) {
                format!("{} {}", prefix, entry.message)
            } else {
                entry.message
            };

            if let Err(e) = writeln!(file, "[{}] {}", entry.timestamp, message) {
                eprintln!("Failed to write log: {}", e);
                // reopened on the next entry
                file_cache.remove(filename);
            }
        }
    });
}

/// Append panics to `logs/crash.log`. Written from the panicking thread, not
/// through the domain queue.
pub fn setup_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let msg = format!(
            "{}\nBacktrace: {:?}\n",
            info,
            std::backtrace::Backtrace::capture()
        );
        eprintln!("{}", msg);

        if let Ok(guard) = LOG_DIR_PATH.lock() {
            if let Some(ref dir) = *guard {
                let crash_file = dir.join("logs").join("crash.log");
                if let Some(parent) = crash_file.parent() {
                    let _ = fs::create_dir_all(parent);
                }

                if let Ok(mut file) = open_append(&crash_file) {
                    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                    let _ = writeln!(file, "[{}] {}", timestamp, msg);
                }
            }
        }
    }));
}

/// Queue `message` for the file of `domain` (see `domain_target`). Fails
/// with `NotConnected` until `init_log_dir` has run.
pub fn write_domain_log(domain: &str, message: &str) -> io::Result<()> {
    if let Ok(guard) = LOG_TX.lock() {
        if let Some(tx) = &*guard {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            let _ = tx.send(LogEntry {
                domain: domain.to_string(),
                message: message.to_string(),
                timestamp,
            });
            return Ok(());
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotConnected,
        "Logger not initialized",
    ))
}
