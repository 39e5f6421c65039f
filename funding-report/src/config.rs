use std::path::Path;

const DEFAULT_HKD_TO_USD_RATE: f64 = 7.78;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid environment variable {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Load `path`, or a `.env` file from the working directory, into the process environment.
///
/// Variables already set are not overridden. Has to run before anything reads the environment,
/// including the local time zone lookup through `TZ`.
pub fn load_env_file(path: Option<&Path>) {
    let loaded = match path {
        Some(path) => dotenv::from_path(path).map(|_| path.to_path_buf()),
        None => dotenv::dotenv(),
    };

    match loaded {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load environment file: {e}"),
    }
}

/// Credentials and settings read from the environment.
pub struct Config {
    pub ftx: FtxConfig,
    pub google: GoogleConfig,
    pub hkd_to_usd_rate: f64,
}

pub struct FtxConfig {
    pub api_key: String,
    pub api_secret: String,
    pub subaccount: Option<String>,
}

pub struct GoogleConfig {
    pub sheet_id: String,
    pub service_account_email: String,
    /// PEM encoded, possibly with escaped newlines.
    pub private_key: String,
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// Call [`load_env_file`] first for a `.env` file to be taken into account.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |name: &'static str| var(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let hkd_to_usd_rate = match optional("HKD_TO_USD_RATE") {
            Some(rate) => match rate.trim().parse::<f64>() {
                Ok(rate) if rate.is_finite() && rate > 0.0 => rate,
                Ok(rate) => {
                    return Err(ConfigError::Invalid {
                        var: "HKD_TO_USD_RATE",
                        reason: format!("{rate} is not a positive rate"),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "HKD_TO_USD_RATE",
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_HKD_TO_USD_RATE,
        };

        Ok(Self {
            ftx: FtxConfig {
                api_key: required("API_KEY")?,
                api_secret: required("API_SECRET")?,
                subaccount: optional("SUBACCOUNT"),
            },
            google: GoogleConfig {
                sheet_id: required("GOOGLE_SHEET_ID")?,
                service_account_email: required("GOOGLE_SERVICE_ACCOUNT_EMAIL")?,
                private_key: required("GOOGLE_PRIVATE_KEY")?,
            },
            hkd_to_usd_rate,
        })
    }
}
