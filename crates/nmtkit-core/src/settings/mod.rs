//! Settings schemas and configuration file loading.

mod loader;
mod schema;

pub use loader::{
    CONFIG_FILES_ENV, DEFAULT_CONFIG_FILES, config_files_from, deep_merge, get_config_files,
    load_config, load_settings, load_yaml,
};
pub use schema::{
    AuthMethod, AuthSettings, DiscoveredService, IdProvider, IncomingAuthApiKey,
    IncomingAuthClient, IncomingAuthSettings, LoggerSettings, LoggingSettings,
    OutgoingAuthClient, OutgoingAuthHeaders, OutgoingAuthSettings, SectionAcl,
    ServiceDiscoverySettings, SettingsMap,
};
