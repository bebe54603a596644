use std::{process, sync::Arc};

use cachet::{
    application::error::AppError,
    application::repos::SamplesRepo,
    cache::{CacheAside, MemoryCache, TaskTracker},
    config,
    infra::{db::PostgresSamples, error::InfraError, http, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresSamples::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresSamples::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let samples: Arc<dyn SamplesRepo> = Arc::new(
        PostgresSamples::new(pool).with_op_timeout(settings.database.statement_timeout()),
    );
    let cache = Arc::new(MemoryCache::new(&settings.cache));
    let coordinator = Arc::new(CacheAside::new(
        settings.cache.clone(),
        cache,
        TaskTracker::new(),
    ));

    let router = http::build_router(http::AppState {
        samples,
        coordinator: coordinator.clone(),
    });

    let listener = tokio::net::TcpListener::bind(settings.server.listen)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(listen = %settings.server.listen, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    // The HTTP surface is down; finish outstanding cache population and
    // invalidation before exiting so no purge is dropped.
    let drain_timeout = settings.shutdown.drain_timeout();
    info!(
        outstanding = coordinator.tasks().outstanding(),
        timeout_secs = drain_timeout.as_secs(),
        "draining background cache tasks"
    );
    if coordinator.drain(drain_timeout).await {
        info!("all background cache tasks finished");
    } else {
        warn!(
            outstanding = coordinator.tasks().outstanding(),
            "drain timed out with cache tasks still pending"
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("interrupt received, shutting down"),
        _ = terminate => info!("terminate received, shutting down"),
    }
}
