use chrono::Local;
use log::LevelFilter;
use std::io::{self, Write};

use env_logger::{Builder, Target};

/// Multi-writer for logging to both file and stdout
struct DualWriter {
    file: std::fs::File,
    stdout: io::Stdout,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.stdout.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.stdout.flush()?;
        Ok(())
    }
}

/// Initialize logging. A file path (from `--log-file` or `FUTABA_LOG_FILE`)
/// selects the dual file+stdout logger; otherwise plain env_logger.
pub fn init_logging(log_file: Option<String>) {
    let log_file = log_file.or_else(|| std::env::var("FUTABA_LOG_FILE").ok());

    if let Some(path) = log_file {
        if let Err(err) = init_dual_logger(&path) {
            eprintln!("Failed to initialize file logger at '{path}': {err}");
            env_logger::init();
        }
    } else {
        env_logger::init();
    }
}

/// Initialize dual logger (outputs to both file and terminal)
fn init_dual_logger(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let dual_writer = DualWriter {
        file,
        stdout: io::stdout(),
    };

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(dual_writer)))
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Logger initialized - logging to file and terminal");

    Ok(())
}
