use std::collections::HashSet;
use std::time::Duration;

use planetoid::session::{DEFAULT_MAX_PLAYERS, DEFAULT_MAX_USERNAME_LEN, RegistryConfig};
use planetoid::{DEFAULT_PORT, DEFAULT_TICK_RATE, ShipConfig};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub tick_rate: u32,
    pub max_clients: usize,
    pub max_username_len: u8,
    pub banned_usernames: Vec<String>,
    pub planet_radius: f32,
    pub ship: ShipConfig,
    pub connection_timeout_secs: u64,
    pub npc_count: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tick_rate: DEFAULT_TICK_RATE,
            max_clients: DEFAULT_MAX_PLAYERS,
            max_username_len: DEFAULT_MAX_USERNAME_LEN,
            banned_usernames: Vec::new(),
            planet_radius: 60.0,
            ship: ShipConfig::default(),
            connection_timeout_secs: 10,
            npc_count: 0,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            max_username_len: self.max_username_len,
            max_players: self.max_clients,
            banned_usernames: self.banned_usernames.iter().cloned().collect::<HashSet<_>>(),
        }
    }
}
