use clap::Parser;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;

use tutor::LogLevel;
use tutor::core::config;
use tutor::tui;

#[derive(Parser)]
#[command(name = "tutor", about = "Ask questions about your course lectures")]
struct Args {
    /// Base URL of the question-answering API (overrides config and TUTOR_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Log level for tutor.log
    #[arg(long, default_value_t, value_enum)]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to tutor.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("tutor.log") {
        let _ = WriteLogger::init(args.log_level.into(), log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("Ignoring config file: {}", e);
        config::TutorConfig::default()
    });
    let resolved = config::resolve(&file_config, args.api_url.as_deref());

    log::info!(
        "Tutor starting up against {} (batch {} chars every {:?})",
        resolved.api_url,
        resolved.pacing.batch_size,
        resolved.pacing.tick
    );

    tui::run(resolved)
}
