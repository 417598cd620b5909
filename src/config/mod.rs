mod settings;

pub use settings::{
    Config, PowerConfig, RegistryConfig, RegistryTweak, ServiceConfig, TelemetryConfig,
    EXAMPLE_CONFIG,
};
