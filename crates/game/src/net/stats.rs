use super::transport::Delivery;

#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl NetworkStats {
    pub fn record_sent(&mut self, bytes: usize) {
        self.packets_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.packets_received += 1;
        self.bytes_received += bytes as u64;
    }

    pub fn loss_percent(&self) -> f32 {
        let attempted = self.packets_sent + self.packets_dropped;
        if attempted == 0 {
            return 0.0;
        }
        self.packets_dropped as f32 / attempted as f32 * 100.0
    }
}

/// Deterministic link impairment for tests. Unreliable frames can be
/// dropped on a fixed cadence and handed over in reverse order; reliable
/// frames only suffer the same when `impair_reliable` is set.
#[derive(Debug, Clone, Default)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    /// Drop every n-th impaired frame.
    pub drop_every: u32,
    pub reverse_order: bool,
    pub impair_reliable: bool,
}

impl PacketLossSimulation {
    /// A link that loses and reorders everything, control traffic included.
    pub fn lossy(drop_every: u32) -> Self {
        Self {
            enabled: true,
            drop_every,
            reverse_order: true,
            impair_reliable: true,
        }
    }

    pub fn impairs(&self, delivery: Delivery) -> bool {
        self.enabled && (delivery == Delivery::Unreliable || self.impair_reliable)
    }

    pub fn should_drop(&self, impaired_index: u64) -> bool {
        self.enabled && self.drop_every > 0 && (impaired_index + 1) % self.drop_every as u64 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_cadence() {
        let sim = PacketLossSimulation {
            enabled: true,
            drop_every: 3,
            reverse_order: false,
            impair_reliable: false,
        };
        let dropped: Vec<u64> = (0..9).filter(|&i| sim.should_drop(i)).collect();
        assert_eq!(dropped, vec![2, 5, 8]);

        let disabled = PacketLossSimulation {
            enabled: false,
            ..sim
        };
        assert!(!(0..9).any(|i| disabled.should_drop(i)));
    }

    #[test]
    fn reliable_frames_impaired_only_on_request() {
        let mut sim = PacketLossSimulation::lossy(2);
        assert!(sim.impairs(Delivery::Reliable));
        assert!(sim.impairs(Delivery::Unreliable));

        sim.impair_reliable = false;
        assert!(!sim.impairs(Delivery::Reliable));
        assert!(sim.impairs(Delivery::Unreliable));

        sim.enabled = false;
        assert!(!sim.impairs(Delivery::Unreliable));
    }

    #[test]
    fn loss_percent() {
        let mut stats = NetworkStats::default();
        assert_eq!(stats.loss_percent(), 0.0);
        stats.record_sent(10);
        stats.packets_dropped = 1;
        assert_eq!(stats.loss_percent(), 50.0);
    }
}
