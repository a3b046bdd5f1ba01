use std::sync::Arc;

use color_eyre::Result;
use course_rag::{app::App, Config, RagSystem};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    color_eyre::install()?;

    // File logging only; stdout belongs to the TUI.
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    // Reads .env as well.
    let config = Config::from_env()?;
    let system = RagSystem::from_config(config)?;
    let (courses, chunks) = system.load_docs_dir()?;
    tracing::info!(target: "app", courses, chunks, "startup_ingest_done");

    let app = App::new(Arc::new(system));
    let terminal = ratatui::init();
    let res = course_rag::run(terminal, app);
    ratatui::restore();
    res
}
