use std::{env, net::IpAddr};

use duka_common::{
    helpers::{parse_boolean_flag, parse_list},
    Secret,
};
use log::*;
use mobile_money_tools::{AirtelConfig, MpesaConfig};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::errors::ServerError;

const DEFAULT_DUKA_HOST: &str = "127.0.0.1";
const DEFAULT_DUKA_PORT: u16 = 8360;
const DEFAULT_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If supplied, requests against the `/callbacks` endpoints are only accepted from these addresses.
    pub callback_whitelist: Option<Vec<IpAddr>>,
    pub mpesa: MpesaConfig,
    pub airtel: AirtelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DUKA_HOST.to_string(),
            port: DEFAULT_DUKA_PORT,
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            callback_whitelist: None,
            mpesa: MpesaConfig::default(),
            airtel: AirtelConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DUKA_HOST").ok().unwrap_or_else(|| DEFAULT_DUKA_HOST.into());
        let port = env::var("DUKA_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for DUKA_PORT. {e} Using the default, {DEFAULT_DUKA_PORT}, \
                         instead."
                    );
                    DEFAULT_DUKA_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_DUKA_PORT);
        let database_url = env::var("DUKA_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ DUKA_DATABASE_URL is not set. Please set it to the URL for the Duka database.");
            String::default()
        });
        let max_connections = env::var("DUKA_MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>().map_err(|e| warn!("🪛️ Invalid value for DUKA_MAX_DB_CONNECTIONS ({s}). {e}")).ok()
            })
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("DUKA_USE_X_FORWARDED_FOR").ok(), false);
        let callback_whitelist = env::var("DUKA_CALLBACK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        log_whitelist(&callback_whitelist);
        Self {
            host,
            port,
            database_url,
            max_connections,
            auth,
            use_x_forwarded_for,
            callback_whitelist,
            mpesa: MpesaConfig::new_from_env_or_default(),
            airtel: AirtelConfig::new_from_env_or_default(),
        }
    }
}

/// "none", "false" and "0" explicitly disable the whitelist. Invalid entries are skipped.
fn parse_whitelist(value: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&value.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ The callback IP whitelist is disabled. If this is not what you want, set DUKA_CALLBACK_IP_WHITELIST to \
             a comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = parse_list(value)
        .into_iter()
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in DUKA_CALLBACK_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

fn log_whitelist(whitelist: &Option<Vec<IpAddr>>) {
    match whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The callback IP whitelist was configured, but is empty. The server will run, but won't accept any \
                 provider callbacks."
            );
        },
        None => {
            info!("🪛️ No callback IP whitelist is set. Provider callbacks are accepted from any address.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Callback IP whitelist: {addrs}");
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared HS256 secret the identity service signs access tokens with.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No externally issued \
             token will be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("DUKA_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [DUKA_JWT_SECRET]")))?;
        if secret.trim().is_empty() {
            return Err(ServerError::ConfigurationError("DUKA_JWT_SECRET is empty".to_string()));
        }
        Ok(Self::new(secret))
    }
}
