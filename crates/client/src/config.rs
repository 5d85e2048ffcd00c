use std::time::Duration;

use planetoid::{DEFAULT_TICK_RATE, ShipConfig};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub tick_rate: u32,
    pub planet_radius: f32,
    pub ship: ShipConfig,
    pub connection_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            planet_radius: 60.0,
            ship: ShipConfig::default(),
            connection_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}
