use occupancy_latency::config::Config;
use occupancy_latency::error::AppError;
use occupancy_latency::state::{DashboardContext, DashboardSettings};
use occupancy_latency::{api, config, dataset};
use std::net::SocketAddr;
use std::sync::Arc;

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Everything below runs once; the server only reads the result.
fn build_context(config: &Config) -> Result<DashboardContext, AppError> {
    let store = dataset::load_from_path(config.dataset_path(), config.max_rows())?;
    DashboardContext::build(store, DashboardSettings::from_config(config))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = config::load_default()?;
    init_tracing(config.log_level());
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %config.app.name,
        "occupancy-latency starting"
    );

    let context = build_context(&config)?;

    let app = api::router(Arc::new(context));
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Dashboard listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn default_config_builds_the_sample_dashboard() -> Result<(), AppError> {
        let config = config::load_default()?;

        let context = build_context(&config)?;

        assert!(context.visible_range().is_some());
        Ok(())
    }

    #[test]
    fn missing_dataset_surfaces_as_load_error() -> Result<(), AppError> {
        let mut config = config::load_default()?;
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        config.dataset.path = std::env::temp_dir().join(format!("occupancy-absent-{unique}.csv"));

        let result = build_context(&config);

        assert!(matches!(result, Err(AppError::Load(_))));
        Ok(())
    }

    #[test]
    fn missing_config_surfaces_as_config_error() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("occupancy-absent-{unique}.toml"));

        let result: Result<Config, AppError> = config::load_from_path(path).map_err(AppError::from);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
