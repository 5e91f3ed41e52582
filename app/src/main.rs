mod cli;
mod commands;
mod config;
mod constants;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Command};
use commands::CommandError;
use config::AppConfig;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Build(e)) => {
            if e.is_user_correctable() {
                log::info!("{}", e);
            } else {
                log::error!("{}", e);
            }
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let config_dir = cli.config_dir.unwrap_or_else(AppConfig::default_dir);

    if let Command::InitConfig { force } = cli.command {
        return commands::init_config(&config_dir, force).await;
    }

    let config = AppConfig::load(&config_dir)
        .await?
        .with_api_key_override(std::env::var(constants::env::API_KEY).ok());

    match cli.command {
        Command::Generate(args) => commands::generate(&config, args).await,
        Command::Inspect(args) => commands::inspect(&config, args),
        Command::Prompt => {
            commands::prompt(&config);
            Ok(())
        }
        Command::InitConfig { .. } => Ok(()),
    }
}
