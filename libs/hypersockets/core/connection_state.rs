//! Lock-free connection state and metrics tracking.
//!
//! `ConnectionState` transitions are driven entirely by the client's own
//! task; `AtomicConnectionState` just gives other threads (the manager,
//! `metrics()` callers) a consistent, allocation-free way to read it.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle state of a single WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    ShuttingDown,
}

impl ConnectionState {
    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting => 3,
            ConnectionState::ShuttingDown => 4,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Reconnecting,
            _ => ConnectionState::ShuttingDown,
        }
    }
}

/// Atomic, `Sync` holder for `ConnectionState`.
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(initial: ConnectionState) -> Self {
        Self { inner: AtomicU8::new(initial.to_u8()) }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, new: ConnectionState) {
        self.inner.store(new.to_u8(), Ordering::Release);
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.get() == ConnectionState::ShuttingDown
    }

    /// Atomically transition from `current` to `new`, failing (and returning
    /// the observed state) if another thread already moved off `current`.
    pub fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> Result<ConnectionState, ConnectionState> {
        match self.inner.compare_exchange(
            current.to_u8(),
            new.to_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(v) => Ok(ConnectionState::from_u8(v)),
            Err(v) => Err(ConnectionState::from_u8(v)),
        }
    }
}

/// Atomic counters backing `Metrics` snapshots.
#[derive(Default)]
pub struct AtomicMetrics {
    sent: AtomicU64,
    received: AtomicU64,
    reconnects: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn messages_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.sent.store(0, Ordering::Relaxed);
        self.received.store(0, Ordering::Relaxed);
        self.reconnects.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_exchange_only_lets_one_winner_through() {
        let state = AtomicConnectionState::new(ConnectionState::Disconnected);
        assert!(state.compare_exchange(ConnectionState::Disconnected, ConnectionState::Connecting).is_ok());
        assert!(state.compare_exchange(ConnectionState::Disconnected, ConnectionState::Connecting).is_err());
    }

    #[test]
    fn metrics_counters_are_independent() {
        let m = AtomicMetrics::new();
        m.increment_sent();
        m.increment_sent();
        m.increment_received();
        m.increment_reconnects();
        assert_eq!(m.messages_sent(), 2);
        assert_eq!(m.messages_received(), 1);
        assert_eq!(m.reconnect_count(), 1);
    }
}
