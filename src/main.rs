use std::net::SocketAddr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sahocars::config::{DatabaseConfig, EnvironmentConfig};
use sahocars::database::DatabaseConnection;
use sahocars::{create_app_router, AppState};

const DEFAULT_LOG_FILTER: &str = "sahocars=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = EnvironmentConfig::from_env().context("Configuracion invalida")?;
    info!(
        "Sahocars {} ({}) en entorno {}",
        config.app_version, config.app_commit, config.environment
    );

    for dir in [&config.data_dir, &config.storage_root, &config.backup_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("No se pudo crear {}", dir.display()))?;
    }

    let db = DatabaseConnection::connect(&DatabaseConfig::new(config.database_url.clone())).await?;
    db.run_migrations().await?;
    db.seed_branches(&config.default_branches).await?;

    let addr = config.server_addr()?;
    let app = create_app_router(AppState::new(db.into_pool(), config));

    info!("Servidor escuchando en http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("Error del servidor: {}", e);
            e
        })?;

    info!("Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("Señal de terminación recibida, apagando servidor...");
        },
    }
}
