//! Server configuration

use shared::ShippingSettings;

/// Server configuration
///
/// Every field can be overridden through an environment variable:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./work_dir | Working directory (database, logs) |
/// | HTTP_PORT | 8001 | HTTP API port |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | STANDARD_SHIPPING_COST | 2500 | Seed value for the flat shipping cost (XAF) |
/// | FREE_SHIPPING_THRESHOLD | 50000 | Seed value for the free-shipping threshold (XAF) |
///
/// The two shipping values only seed the settings store on first boot;
/// after that the persisted, admin-editable values win.
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// First-boot shipping settings
    pub shipping_defaults: ShippingSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = ShippingSettings::default();
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8001),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            shipping_defaults: ShippingSettings {
                standard_shipping_cost: std::env::var("STANDARD_SHIPPING_COST")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.standard_shipping_cost),
                free_shipping_threshold: std::env::var("FREE_SHIPPING_THRESHOLD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.free_shipping_threshold),
            },
        }
    }

    /// Database file path inside the working directory
    pub fn db_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("nengoo.redb")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
