use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Real-time collaboration coordinator
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(
    name = "collab-server",
    version,
    about = "Real-time collaboration coordinator for shared project workspaces"
)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "COLLAB_PORT", default_value = "4000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "COLLAB_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./collab.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "COLLAB_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Deadline in milliseconds for external calls (access checks,
    /// persistence, identity, activity log). A timed-out call behaves
    /// like a provider failure.
    #[arg(long, env = "COLLAB_PROVIDER_TIMEOUT_MS", default_value = "5000")]
    pub provider_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4000,
            bind_address: "0.0.0.0".to_string(),
            config: "./collab.toml".to_string(),
            json_logs: false,
            generate_config: false,
            provider_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (COLLAB_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("COLLAB_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Collaboration Coordinator Configuration
# Place this file at ./collab.toml or specify with --config <path>
# All settings can be overridden via environment variables (COLLAB_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 4000)
# port = 4000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Deadline in milliseconds for external provider calls (default: 5000)
# provider_timeout_ms = 5000
"#
    .to_string()
}
