//! `weaver`: record a dream, read its report, and talk it through.

mod command;
mod logging;
mod render;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use weaver_application::DreamFlow;
use weaver_core::secret::SecretService;
use weaver_infrastructure::{ConfigService, SecretServiceImpl, WeaverPaths, resolve_api_key};
use weaver_interaction::GeminiApiClient;

#[derive(Parser, Debug)]
#[command(name = "weaver", version, about = "Dream journal with AI-woven interpretive reports")]
struct Args {
    /// Directory holding config.toml, secret.json and logs
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Model name, overriding the configuration
    #[arg(long)]
    model: Option<String>,

    /// Mirror logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let paths = WeaverPaths::new(args.config_dir.as_deref())?;
    let mut config = ConfigService::new(paths.clone()).get_config()?;
    let _log_guard = logging::init(&paths.logs_dir(), &config.log.level, args.verbose)?;

    let secret_service = SecretServiceImpl::new(&paths);
    let secrets = secret_service.load_secrets().await?;
    let api_key = match resolve_api_key(&secrets) {
        Ok(key) => key,
        Err(err) => {
            let hint = if secret_service.secret_file_exists().await {
                format!(
                    "Add your key to {} or export GEMINI_API_KEY.",
                    paths.secret_file().display()
                )
            } else {
                let created = paths.ensure_secret_file()?;
                format!(
                    "Created {}; add your key there or export GEMINI_API_KEY.",
                    created.display()
                )
            };
            eprintln!("{}", render::error(&format!("{err}\n{hint}")));
            return Err(err.into());
        }
    };

    // --model beats secret.json, which beats config.toml
    let secret_model = secrets.gemini.as_ref().and_then(|gemini| gemini.model_name.clone());
    if let Some(model) = args.model.or(secret_model) {
        config.model.model_name = model;
    }

    let client = GeminiApiClient::from_config(api_key, &config.model)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.model.model_name,
        report_timeout_secs = config.model.report_timeout_secs,
        chat_timeout_secs = config.model.chat_timeout_secs,
        "dreamweaver starting"
    );

    let flow = DreamFlow::new(Arc::new(client), config.model.timeouts());
    shell::Shell::new(flow).run().await
}
