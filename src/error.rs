use crate::charts::ChartError;
use crate::config::ConfigError;
use crate::dataset::LoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("dataset load error: {0}")]
    Load(#[from] LoadError),
    #[error("chart error: {0}")]
    Chart(#[from] ChartError),
    #[error("dataset has {rows} row(s); at least two are needed to detect transitions")]
    EmptyDataset { rows: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
