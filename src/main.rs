use std::{future::IntoFuture, process, sync::Arc};

use beyonder_reporter::{
    application::{
        commands::CommandService, derivation::derive_pathway, error::AppError,
        reports::ReportService,
    },
    cache::{CacheConfig, CacheCoordinator},
    config,
    infra::{
        error::InfraError,
        files::DataFiles,
        http::{self, AdminState, HttpState},
        source::YamlDirectorySource,
        telemetry,
    },
};
use serde::Serialize;
use tokio::{signal, sync::watch, try_join};
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .clone()
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(cli_args, settings).await,
        config::Command::Snapshot(_) => run_snapshot(settings).await,
        config::Command::Pathway(args) => run_pathway(settings, &args.player).await,
    }
}

async fn run_serve(cli_args: config::CliArgs, settings: config::Settings) -> Result<(), AppError> {
    let source = Arc::new(YamlDirectorySource::new(
        settings.source.beyonders_dir.clone(),
    ));
    let coordinator = CacheCoordinator::new(source, CacheConfig::from(&settings));
    let commands = CommandService::new(
        coordinator.clone(),
        Arc::new(config::ConfigReloader::new(cli_args)),
    );
    let reports = Arc::new(ReportService::new(DataFiles::from_settings(
        &settings.source,
    )));

    let http_state = HttpState {
        coordinator: coordinator.clone(),
        reports,
    };
    let admin_state = AdminState { commands };

    let result = serve_http(&settings, http_state, admin_state).await;

    coordinator.shutdown();
    info!(target = "reporter::server", "caches released");
    result
}

async fn run_snapshot(settings: config::Settings) -> Result<(), AppError> {
    let source = Arc::new(YamlDirectorySource::new(
        settings.source.beyonders_dir.clone(),
    ));
    let config = CacheConfig {
        refresh_interval_minutes: 0,
        ..CacheConfig::from(&settings)
    };
    let snapshot = CacheCoordinator::snapshot_once(source, config).await?;
    print_json(&*snapshot)
}

async fn run_pathway(settings: config::Settings, player: &str) -> Result<(), AppError> {
    let source = YamlDirectorySource::new(settings.source.beyonders_dir.clone());
    let record = derive_pathway(player, &source).await?;
    print_json(&record)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode JSON: {err}")))?;
    println!("{json}");
    Ok(())
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state, &settings.endpoints);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "reporter::server",
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let public_server = axum::serve(public_listener, public_router)
        .with_graceful_shutdown(shutdown_requested(shutdown_rx.clone()))
        .into_future();
    let admin_server = axum::serve(admin_listener, admin_router)
        .with_graceful_shutdown(shutdown_requested(shutdown_rx))
        .into_future();

    let servers = async { try_join!(public_server, admin_server) };
    tokio::pin!(servers);

    tokio::select! {
        result = &mut servers => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    info!(
        target = "reporter::server",
        grace_secs = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested, draining connections"
    );
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(settings.server.graceful_shutdown, servers).await {
        Ok(result) => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        Err(_) => warn!(
            target = "reporter::server",
            "graceful shutdown timed out, dropping open connections"
        ),
    }

    Ok(())
}

async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.changed().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(target = "reporter::server", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "reporter::server", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
