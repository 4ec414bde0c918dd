//! Command-line configuration.

use clap::Parser;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::net::IpAddr;

const SALT_LENGTH: usize = 16;

/// Server settings parsed from the command line.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Config {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "25565")]
    pub port: u16,
    /// Name shown to clients while joining
    #[clap(long, default_value = "Classic Server")]
    pub server_name: String,
    /// Message of the day shown under the server name
    #[clap(long, default_value = "Welcome!")]
    pub motd: String,
    /// Maximum number of players online at once
    #[clap(long, default_value = "20")]
    pub max_players: usize,
    /// World width (x)
    #[clap(long, default_value = "128")]
    pub width: i16,
    /// World height (y, vertical)
    #[clap(long, default_value = "64")]
    pub height: i16,
    /// World length (z)
    #[clap(long, default_value = "128")]
    pub length: i16,
    /// Skip movement packet spam and speed checks
    #[clap(long)]
    pub allow_speed_hack: bool,
    /// Skip the block placement rate limit
    #[clap(long = "no-click-rate-limit", action = clap::ArgAction::SetFalse)]
    pub limit_click_rate: bool,
    /// Salt for name verification tokens (random when omitted)
    #[clap(long)]
    pub salt: Option<String>,
    /// Operator names
    #[clap(long = "op")]
    pub ops: Vec<String>,
    /// Banned player names
    #[clap(long = "ban")]
    pub banned_names: Vec<String>,
    /// Banned IP addresses
    #[clap(long = "ban-ip")]
    pub banned_addresses: Vec<IpAddr>,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured salt, or a fresh random one.
    pub fn resolve_salt(&self) -> String {
        self.salt.clone().unwrap_or_else(generate_salt)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["server"])
    }
}

pub fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}
