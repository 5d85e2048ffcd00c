use std::collections::VecDeque;

use log::warn;

use super::types::GameEvent;

pub const DEFAULT_MAX_PENDING: usize = 1024;

pub struct EventQueue {
    pending: VecDeque<GameEvent>,
    max_pending: usize,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

impl EventQueue {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(max_pending.min(64)),
            max_pending,
        }
    }

    pub fn push(&mut self, event: GameEvent) {
        if self.pending.len() >= self.max_pending && !self.evict_oldest_transient() {
            warn!("event queue full ({} pending), keeping {:?}", self.pending.len(), event);
        }
        self.pending.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.pending.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn evict_oldest_transient(&mut self) -> bool {
        match self.pending.iter().position(GameEvent::is_transient) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }
}
