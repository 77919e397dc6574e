use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use rpc_breaker::config::{load_config, ConfigError, InvokerConfig};
use rpc_breaker::observability::logging;
use rpc_breaker::resilience::{RpcError, RpcInvoker};

#[derive(Parser)]
#[command(name = "breaker-cli")]
#[command(about = "Inspect RPC error classification and breaker configuration", long_about = None)]
struct Cli {
    /// Invoker configuration (TOML). Built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an error message as business or system
    Classify { message: String },
    /// Show what a caller sees when a service returns this error
    Friendly { service: String, message: String },
    /// Validate a configuration file
    CheckConfig { path: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => InvokerConfig::default(),
    };
    logging::init(&config.observability.log_level);

    match cli.command {
        Commands::Classify { message } => {
            let invoker = RpcInvoker::new(&config);
            let class = invoker.classify(&RpcError::from(message.as_str()));
            print_json(&json!({ "message": message, "class": class }))?;
        }
        Commands::Friendly { service, message } => {
            let invoker = RpcInvoker::new(&config);
            let err = RpcError::from(message.as_str());
            let class = invoker.classify(&err);
            let shown = invoker.friendly_error(&service, err);
            print_json(&json!({
                "service": service,
                "message": message,
                "class": class,
                "shown": shown.to_string(),
            }))?;
        }
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(checked) => {
                print_json(&json!({
                    "path": path,
                    "valid": true,
                    "breaker": checked.breaker,
                    "retry": checked.retry,
                    "services": checked.messages.services.len(),
                }))?;
            }
            Err(ConfigError::Validation(errors)) => {
                let errors: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                print_json(&json!({ "path": path, "valid": false, "errors": errors }))?;
                std::process::exit(1);
            }
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
