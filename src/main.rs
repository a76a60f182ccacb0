//! SmartPrice - Main Entry Point

use clap::Parser;
use smartprice::cli::{
    cmd_info, cmd_predict_fraud, cmd_predict_price, cmd_train, cmd_train_fraud, cmd_train_price,
    resolve_config, Cli, Commands,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smartprice=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Train => cmd_train(&config)?,
        Commands::TrainPrice => cmd_train_price(&config)?,
        Commands::TrainFraud => cmd_train_fraud(&config)?,
        Commands::PredictPrice(args) => cmd_predict_price(&config, args.into())?,
        Commands::PredictFraud(args) => cmd_predict_fraud(&config, args.into())?,
        Commands::Info => cmd_info(&config)?,
    }

    Ok(())
}
