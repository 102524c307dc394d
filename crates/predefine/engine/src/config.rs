//! Configuration for the predefinition registry

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Whether predefinition is supported at all
    #[serde(default)]
    pub enabled: bool,

    /// How many skipped names the seal report samples
    #[serde(default = "default_skipped_sample_limit")]
    pub skipped_sample_limit: usize,

    /// Substring marking synthesized callable-site type names
    #[serde(default = "default_synthesized_site_marker")]
    pub synthesized_site_marker: String,

    /// Field widened on synthesized-site artifacts
    #[serde(default = "default_instance_field")]
    pub instance_field: String,

    /// Constructor widened on synthesized-site artifacts
    #[serde(default = "default_constructor_name")]
    pub constructor_name: String,

    /// Warn when a caller-supplied hash disagrees with the computed raw hash
    #[serde(default)]
    pub verify_supplied_hash: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            skipped_sample_limit: default_skipped_sample_limit(),
            synthesized_site_marker: default_synthesized_site_marker(),
            instance_field: default_instance_field(),
            constructor_name: default_constructor_name(),
            verify_supplied_hash: false,
        }
    }
}

// Default value helpers
fn default_skipped_sample_limit() -> usize {
    10
}

fn default_synthesized_site_marker() -> String {
    "$$Lambda".to_string()
}

fn default_instance_field() -> String {
    "LAMBDA_INSTANCE$".to_string()
}

fn default_constructor_name() -> String {
    "<init>".to_string()
}

impl RegistryConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `PREDEFINE_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&RegistryConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PREDEFINE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Configuration with predefinition switched on.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }
}
