use std::sync::Arc;

use tracing::{error, info, warn};

use freebies::bot::start_bot_poller;
use freebies::watcher::start_watcher;
use freebies::{
    BotPoller, CommandHandler, Config, Database, InclusionFilter, Metrics, Source, TelegramClient,
    Watcher, WebServer,
};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = freebies::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        freebies::logging::init_console_only(&config.logging.level);
    }

    info!("Freebies - free game watcher");

    if let Err(e) = run(config).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> freebies::Result<()> {
    config.validate()?;

    let db = Arc::new(Database::open(&config.database.path).await?);
    info!("Using database at {}", config.database.path);

    let source = Arc::new(Source::from_config(&config.source)?);
    info!("Polling {} source at {}", config.source.kind, source.url());

    let telegram = Arc::new(TelegramClient::new(
        &config.telegram.api_url,
        &config.telegram.token,
    )?);
    let me = telegram.get_me().await?;
    info!(
        "Authorized on account {}",
        me.username.as_deref().unwrap_or("<unnamed>")
    );

    let filter = InclusionFilter::from_names(&config.filter.rules)?;
    let metrics = Metrics::new()?;

    let mut tasks = Vec::new();

    if config.watcher.enabled {
        let watcher = Watcher::from_config(
            Arc::clone(&db),
            Arc::clone(&source),
            Arc::clone(&telegram),
            filter.clone(),
            &config.watcher,
        )
        .with_metrics(metrics.clone());
        tasks.push(start_watcher(watcher));
    } else {
        warn!("Watcher is disabled");
    }

    if config.web.enabled {
        let server = WebServer::new(
            &config.web,
            Arc::clone(&db),
            Arc::clone(&telegram),
            metrics,
        )?;
        info!("Admin surface on http://{}", server.addr());
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Web server error: {e}");
            }
        }));
    }

    if config.telegram.commands_enabled {
        let handler = CommandHandler::new(
            Arc::clone(&db),
            Arc::clone(&source),
            Arc::clone(&telegram),
            filter,
        );
        let poller = BotPoller::new(
            Arc::clone(&telegram),
            handler,
            config.telegram.poll_timeout_secs,
        );
        tasks.push(start_bot_poller(poller));
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    for task in tasks {
        task.abort();
    }
    db.close().await;

    Ok(())
}
