use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dailyforge_bot::{Credentials, Gateway, StartupError, TelegramClient};
use dailyforge_core::ai::Timeouts;
use dailyforge_core::{
    Assistant, Clock, Config, DailySchedule, GeminiImage, GeminiSpeech, OpenRouter, Renderer,
    Router, Store, SystemClock,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "dailyforge=info";

#[derive(Parser)]
#[command(name = "dailyforge", version, about = "Dailyforge Telegram bot")]
struct Cli {
    /// Config file (default: <data dir>/config.toml)
    #[arg(long, env = "DAILYFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding config.toml and dailyforge.db
    #[arg(long, env = "DAILYFORGE_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

impl Cli {
    fn config_path(&self) -> Result<PathBuf, StartupError> {
        if let Some(path) = &self.config {
            return Ok(path.clone());
        }
        if let Some(dir) = &self.data_dir {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.join("config.toml"));
        }
        Ok(Config::default_path()?)
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config_path = cli.config_path()?;
    let config = Config::load_from(&config_path)?;
    let credentials = Credentials::from_env()?;
    info!(config = %config_path.display(), "configuration loaded");

    let store = Arc::new(Store::open(&config.database_path(&config_path))?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let router = Router::new(
        store,
        Arc::new(config.catalog.clone()),
        &config,
        &credentials.chat_id.to_string(),
        clock.clone(),
    )?;

    let ai = &config.ai;
    let assistant = Assistant::new(
        Arc::new(OpenRouter::new(
            &ai.text_base_url,
            credentials.openrouter_api_key.as_str(),
            ai.text_model.as_str(),
        )?),
        Arc::new(GeminiImage::new(
            &ai.google_base_url,
            &credentials.google_api_key,
            &ai.image_model,
        )?),
        Arc::new(GeminiSpeech::new(
            &ai.google_base_url,
            &credentials.google_api_key,
            &ai.speech_model,
            ai.voice.as_str(),
        )?),
        Timeouts::from_config(ai),
        router.prompts().persona(),
        router.messages().ai_fallback(),
    );

    let schedule = DailySchedule::from_config(&config.schedule)?;
    for slot in schedule.triggers() {
        info!(at = %slot.at, trigger = ?slot.trigger, "daily trigger");
    }
    let transport = Arc::new(TelegramClient::new(credentials.bot_token.as_str())?);
    let gateway = Gateway::new(
        Arc::new(router),
        Renderer::new(assistant),
        transport,
        credentials.chat_id,
    );

    info!("dailyforge started");
    gateway.run(schedule, clock).await;
    info!("dailyforge stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run(Cli::parse()).await {
        error!(error = %e, "fatal");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
