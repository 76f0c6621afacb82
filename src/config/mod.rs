pub mod env;
mod loader;
pub mod targets;

pub use env::{
    AppConfig, BrowserConfig, CollectionConfig, ConfigError, DirectoryConfig, LlmConfig,
    LoggingConfig, ProviderKind, MISINFO_THRESHOLD_HIGH, MISINFO_THRESHOLD_MEDIUM,
};
pub use loader::load_config;
pub use targets::{load_targets, save_targets};
