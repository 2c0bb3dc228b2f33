mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    DeliveryMode, LoggingSettings, PipelineSettings, Settings, StoreSettings,
};

/// Prefix of environment variables that override file settings,
/// e.g. `TXACK_STORE__PATH` or `TXACK_PIPELINE__DELIVERY_MODE`.
pub const ENV_PREFIX: &str = "TXACK";

/// Loads `config/default` (any format `config` understands, optional) and the
/// `TXACK_*` environment, then merges the result over `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Same as [`load_config`] with an explicit base file name.
pub fn load_config_from(file: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(file).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_over(Settings::default()))
}
