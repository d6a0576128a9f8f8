use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

pub mod macros;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub struct LoggingConfig {
    pub level: LogLevel,
    pub console_output: bool,
    pub file_path: Option<PathBuf>,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            console_output: false,
            file_path: None,
            format: LogFormat::Text,
        }
    }
}

impl LogLevel {
    pub fn to_env_filter(&self) -> String {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
        .to_string()
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Installs the global subscriber. Keep the returned guard alive for as long as logs
/// should reach the file; dropping it flushes the writer.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let (layers, guard) = build_layers(&config)?;
    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(guard)
}

fn build_layers(config: &LoggingConfig) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>), std::io::Error> {
    let mut layers = Vec::new();
    if config.console_output {
        layers.push(fmt_layer(config, std::io::stderr, true));
    }

    let mut guard = None;
    if let Some(path) = &config.file_path {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        let file_name = path
            .file_name()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "log file path has no file name"))?;
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(fmt_layer(config, writer, false));
        guard = Some(worker);
    }

    Ok((layers, guard))
}

fn fmt_layer<W>(config: &LoggingConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::new(config.level.to_env_filter());
    match config.format {
        LogFormat::Text => fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(ansi)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("invalid".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_config_logs_nowhere() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Warn);
        assert!(!config.console_output);
        assert_eq!(config.file_path, None);
        let (layers, guard) = build_layers(&config).unwrap();
        assert!(layers.is_empty());
        assert!(guard.is_none());
    }

    #[test]
    fn test_file_layer_writes_to_nested_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("laivm.log");
        let config = LoggingConfig {
            level: LogLevel::Info,
            console_output: false,
            file_path: Some(path.clone()),
            format: LogFormat::Json,
        };

        let (layers, guard) = build_layers(&config).unwrap();
        let subscriber = tracing_subscriber::registry().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            crate::log_info!("Chunk disassembled", chunk = "main", instructions = 3);
            crate::log_debug!("Filtered out");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Chunk disassembled"));
        assert!(contents.contains("\"instructions\":3"));
        assert!(!contents.contains("Filtered out"));
    }
}
