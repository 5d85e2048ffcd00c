use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};

/// Process-lifetime identifier of one registered user. The top bit separates
/// player-controlled users (clear) from simulated ones (set).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct Guid(u16);

impl Guid {
    pub const NON_PLAYER_BIT: u16 = 0x8000;

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_player(self) -> bool {
        self.0 & Self::NON_PLAYER_BIT == 0
    }

    pub const fn range(self) -> GuidRange {
        if self.is_player() {
            GuidRange::Player
        } else {
            GuidRange::NonPlayer
        }
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:04x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuidRange {
    Player,
    NonPlayer,
}

impl GuidRange {
    pub const fn min(self) -> u16 {
        match self {
            Self::Player => 0x0000,
            Self::NonPlayer => Guid::NON_PLAYER_BIT,
        }
    }

    pub const fn max(self) -> u16 {
        match self {
            Self::Player => Guid::NON_PLAYER_BIT - 1,
            Self::NonPlayer => u16::MAX,
        }
    }

    const fn len(self) -> u32 {
        (self.max() - self.min()) as u32 + 1
    }
}

impl fmt::Display for GuidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::NonPlayer => f.write_str("non-player"),
        }
    }
}

/// Hands out guids from two disjoint ranges. Each range has its own counter
/// that increments monotonically and wraps to the range minimum.
#[derive(Debug, Clone)]
pub struct GuidAllocator {
    next_player: u16,
    next_non_player: u16,
}

impl Default for GuidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GuidAllocator {
    pub fn new() -> Self {
        Self {
            next_player: GuidRange::Player.min(),
            next_non_player: GuidRange::NonPlayer.min(),
        }
    }

    /// Returns the next guid of `range` for which `in_use` is false. Values
    /// still held after a wrap are skipped; `None` means every value is taken.
    pub fn allocate(&mut self, range: GuidRange, in_use: impl Fn(Guid) -> bool) -> Option<Guid> {
        for _ in 0..range.len() {
            let candidate = Guid(self.advance(range));
            if !in_use(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn advance(&mut self, range: GuidRange) -> u16 {
        let counter = match range {
            GuidRange::Player => &mut self.next_player,
            GuidRange::NonPlayer => &mut self.next_non_player,
        };

        let current = *counter;
        *counter = if current == range.max() {
            range.min()
        } else {
            current + 1
        };
        current
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ranges_are_disjoint_by_top_bit() {
        let mut allocator = GuidAllocator::new();
        let player = allocator.allocate(GuidRange::Player, |_| false).unwrap();
        let npc = allocator.allocate(GuidRange::NonPlayer, |_| false).unwrap();

        assert!(player.is_player());
        assert!(!npc.is_player());
        assert_eq!(player.raw(), 0x0000);
        assert_eq!(npc.raw(), 0x8000);
        assert_eq!(npc.range(), GuidRange::NonPlayer);
    }

    #[test]
    fn counters_increment_without_reuse() {
        let mut allocator = GuidAllocator::new();
        let a = allocator.allocate(GuidRange::Player, |_| false).unwrap();
        let b = allocator.allocate(GuidRange::Player, |_| false).unwrap();
        assert_eq!(b.raw(), a.raw() + 1);
    }

    #[test]
    fn counter_wraps_to_range_minimum() {
        let mut allocator = GuidAllocator {
            next_player: GuidRange::Player.max(),
            next_non_player: u16::MAX,
        };

        assert_eq!(
            allocator.allocate(GuidRange::Player, |_| false),
            Some(Guid(0x7FFF))
        );
        assert_eq!(
            allocator.allocate(GuidRange::Player, |_| false),
            Some(Guid(0x0000))
        );
        assert_eq!(
            allocator.allocate(GuidRange::NonPlayer, |_| false),
            Some(Guid(0xFFFF))
        );
        assert_eq!(
            allocator.allocate(GuidRange::NonPlayer, |_| false),
            Some(Guid(0x8000))
        );
    }

    #[test]
    fn wrapped_counter_skips_live_guids() {
        let mut allocator = GuidAllocator {
            next_player: GuidRange::Player.max(),
            next_non_player: GuidRange::NonPlayer.min(),
        };
        let live: HashSet<Guid> = [Guid(0x7FFF), Guid(0x0000), Guid(0x0001)].into();

        let guid = allocator
            .allocate(GuidRange::Player, |g| live.contains(&g))
            .unwrap();
        assert_eq!(guid, Guid(0x0002));
    }

    #[test]
    fn exhausted_range_yields_none() {
        let mut allocator = GuidAllocator::new();
        assert!(allocator.allocate(GuidRange::NonPlayer, |_| true).is_none());
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Guid(0x8001).to_string(), "#8001");
    }
}
