use laivm::asm::assemble;
use laivm::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use laivm::shell::repl::repl;
use laivm::{log_error, log_info, write_disassembly, IndexWidth};

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Parser)]
#[command(name = "laivm")]
#[command(about = "Bytecode assembler and disassembler for the laivm instruction set")]
#[command(version)]
struct Cli {
    /// Assembly listing to disassemble (if not provided, starts the REPL)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Name printed in the disassembly header (defaults to the file name)
    #[arg(long)]
    name: Option<String>,

    /// Width of constant pool indexes
    #[arg(long, value_enum, default_value = "byte")]
    index_width: IndexWidth,

    /// Set the logging level
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Write logs to stderr
    #[arg(long)]
    log_console: bool,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn main() {
    let cli = Cli::parse();

    let logging_config = LoggingConfig {
        level: cli.log_level,
        console_output: cli.log_console,
        file_path: cli.log_file,
        format: cli.log_format,
    };

    // Held until exit so the file writer gets flushed
    let _log_guard = match init_logging(logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("FATAL: Failed to initialize logging system: {}", e);
            exit(1);
        }
    };

    log_info!("laivm starting", version = env!("CARGO_PKG_VERSION"));

    let code = match cli.file {
        Some(path) => {
            let name = cli.name.unwrap_or_else(|| display_name(&path));
            run_file(&path, &name, cli.index_width)
        }
        None => {
            let name = cli.name.unwrap_or_else(|| "repl".to_string());
            match repl(&name, cli.index_width) {
                Ok(()) => 0,
                Err(e) => {
                    log_error!("REPL failed", error = e.to_string().as_str());
                    eprintln!("Readline error: {}", e);
                    74
                }
            }
        }
    };
    exit(code);
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn run_file(path: &Path, name: &str, index_width: IndexWidth) -> i32 {
    let file = path.display().to_string();
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            log_error!("Could not read listing", error = e.to_string().as_str(), file = file.as_str());
            eprintln!("Could not read {}: {}", file, e);
            return 66;
        }
    };

    let chunk = match assemble(&source, index_width) {
        Ok(chunk) => chunk,
        Err(e) => {
            log_error!("Assembly failed", error = e.to_string().as_str(), file = file.as_str());
            eprintln!("{}: {}", file, e);
            return e.exit_code();
        }
    };
    log_info!("Assembled listing", file = file.as_str(), bytes = chunk.len(), constants = chunk.constants().len());

    let mut stdout = std::io::stdout().lock();
    match write_disassembly(&chunk, name, &mut stdout) {
        Ok(_) => 0,
        Err(e) => {
            log_error!("Disassembly failed", error = e.to_string().as_str(), file = file.as_str());
            eprintln!("{}: {}", file, e);
            e.exit_code()
        }
    }
}
