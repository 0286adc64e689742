use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub orders: OrderConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfig {
    /// How long a pending order stays payable.
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,
    /// Interval between expiration sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Recorded as `payment_method` on every gateway transaction.
    #[serde(default = "default_payment_method")]
    pub method: String,
}

fn default_expiry_minutes() -> i64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_payment_method() -> String {
    "VNPay".to_string()
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: default_expiry_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            method: default_payment_method(),
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // No config file: build everything from the environment
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::from_toml_str(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: parse_or(get_env("SERVER_PORT"), 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: parse_or(get_env("DB_MAX_CONNECTIONS"), 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: parse_or(
                            get_env("JWT_ACCESS_EXPIRES_IN"),
                            7200i64,
                        ),
                    },
                    orders: OrderConfig::default(),
                    payment: PaymentConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides(get_env);
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str)
            .map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    /// Environment variables win over the file, even when it exists.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Some(v) = lookup("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(v) = lookup("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = lookup("ORDER_EXPIRY_MINUTES")
            && let Ok(n) = v.parse()
        {
            self.orders.expiry_minutes = n;
        }
        if let Some(v) = lookup("ORDER_SWEEP_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.orders.sweep_interval_secs = n;
        }
        if let Some(v) = lookup("PAYMENT_METHOD") {
            self.payment.method = v;
        }
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.orders.expiry_minutes <= 0 {
            return Err("orders.expiry_minutes must be positive".into());
        }
        if self.orders.sweep_interval_secs == 0 {
            return Err("orders.sweep_interval_secs must be positive".into());
        }
        if self.payment.method.is_empty() || self.payment.method.len() > 50 {
            return Err("payment.method must be 1..=50 characters".into());
        }
        Ok(())
    }
}
