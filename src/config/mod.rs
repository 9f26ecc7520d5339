//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, EmbeddingConfig, LogFormat, LoggingConfig, ServerConfig, StoreBackend, StoreConfig,
};
