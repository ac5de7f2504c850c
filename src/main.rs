use std::net::SocketAddr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};

use fleet_tracking::config::database::DatabaseConfig;
use fleet_tracking::config::{EnvironmentConfig, StorageBackend};
use fleet_tracking::database::DatabaseConnection;
use fleet_tracking::repositories::Repositories;
use fleet_tracking::routes::create_router;
use fleet_tracking::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env().context("configuración inválida")?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!("🛰️ Fleet Tracking - núcleo de rastreo GPS");
    info!("================================================");
    info!("🌍 Entorno: {}", config.environment);

    if config.tracking_api_key.is_none() {
        warn!("⚠️ TRACKING_API_KEY no configurada: /api/tracking responderá 503");
    }

    // Inicializar almacenamiento
    let repositories = match config.storage {
        StorageBackend::Memory => {
            info!("💾 Almacenamiento en memoria");
            Repositories::in_memory()
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .context("DATABASE_URL must be set")?;
            let db_connection = match DatabaseConnection::new(&DatabaseConfig::new(url)).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            Repositories::postgres(db_connection.pool().clone())
        }
    };

    let addr: SocketAddr = config.server_url().parse()?;
    let app_state = AppState::new(config, repositories)
        .await
        .map_err(|e| anyhow::anyhow!("Error cargando vehículos: {}", e))?;
    let app = create_router(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET    /health - Estado del servicio");
    info!("📡 Ingesta:");
    info!("   POST   /api/tracking - Muestra de telemetría (x-api-key)");
    info!("🚗 Vehículos:");
    info!("   GET    /api/vehicles - Listar vehículos");
    info!("   POST   /api/vehicles - Crear vehículo");
    info!("   GET    /api/vehicles/:id - Obtener vehículo");
    info!("   PATCH  /api/vehicles/:id - Actualizar vehículo");
    info!("   DELETE /api/vehicles/:id - Eliminar vehículo");
    info!("📊 Reportes:");
    info!("   GET    /api/trips?vehicleId&startDate&endDate - Trayectos");
    info!("   GET    /api/reports/violations?startDate&endDate - Infracciones");
    info!("🔴 En vivo:");
    info!("   GET    /ws - Actualizaciones de vehículos (WebSocket)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
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
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
