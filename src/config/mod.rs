pub mod schema;

pub use schema::{
    default_config_path, default_relays, Config, LoggingConfig, RelayConfig,
    ReplacementsConfig, ResolverConfig, SearchConfig, APP_DIR_NAME,
};
