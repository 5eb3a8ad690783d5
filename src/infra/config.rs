use anyhow::Context;
use camino::Utf8PathBuf;
use config::Config;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
    pub environment: String,
    pub application: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub payments: PaymentSettings,
    pub email: EmailSettings,
    pub storage: StorageSettings,
}

#[derive(Clone, Deserialize, Debug)]
pub struct ServerSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub logs_directory: String,
    /// Public URL of the storefront, used for links in emails.
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pagination_size: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub latest_products_limit: i64,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", &self.host, &self.port)
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database_name)
            .ssl_mode(match self.require_ssl {
                true => PgSslMode::Require,
                false => PgSslMode::Prefer,
            })
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub token_lifetime_days: u16,
}

#[derive(Clone, Deserialize, Debug)]
pub struct PaymentSettings {
    pub paypal: PayPalSettings,
    pub stripe: StripeSettings,
}

#[derive(Clone, Deserialize, Debug)]
pub struct PayPalSettings {
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Deserialize, Debug)]
pub struct StripeSettings {
    pub api_url: String,
    pub secret_key: String,
    pub webhook_secret: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub webhook_tolerance_secs: i64,
}

#[derive(Clone, Deserialize, Debug)]
pub struct EmailSettings {
    pub api_url: String,
    /// An empty key disables delivery; receipts are logged instead.
    pub api_key: String,
    pub sender: String,
    pub app_name: String,
}

#[derive(Clone, Deserialize, Debug)]
pub struct StorageSettings {
    pub directory: String,
    pub public_base_url: String,
}

/// Walks up from the working directory to the first `config/` holding a `base.yaml`.
fn find_config_dir() -> anyhow::Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine the current directory.")?;
    let cwd = Utf8PathBuf::try_from(cwd).context("Current directory is not valid UTF-8.")?;

    let config_dir = cwd
        .ancestors()
        .map(|dir| dir.join("config"))
        .find(|dir| dir.join("base.yaml").is_file())
        .with_context(|| format!("No config/base.yaml found above {cwd}."))?;

    config_dir
        .canonicalize_utf8()
        .with_context(|| format!("Could not canonicalize config directory {config_dir}."))
}

/// Layers `base.yaml`, then `<APP_ENVIRONMENT>.yaml` (default `development`), then
/// `APP_`-prefixed environment variables, e.g. `APP_PAYMENTS__STRIPE__SECRET_KEY`.
pub fn get_config_settings() -> anyhow::Result<Settings> {
    let config_dir = find_config_dir()?;
    let environment =
        std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_owned());

    let yaml = |name: &str| {
        config::File::from(config_dir.join(name).into_std_path_buf()).required(true)
    };

    Config::builder()
        .add_source(yaml("base"))
        .add_source(yaml(&environment))
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .set_override("environment", environment.as_str())?
        .build()?
        .try_deserialize()
        .context("Could not deserialise config settings.")
}
