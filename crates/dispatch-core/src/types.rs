//! Domain types shared by the registry, scheduler, and listeners.
//!
//! A `WorkerRecord` is one slot of a connection registry. Slots are never
//! removed; a free slot is simply one with `connected == false`.

use std::fmt;
use std::net::IpAddr;

/// Stable position of a worker slot inside a registry.
pub type SlotIndex = usize;

/// Step by which the load ceiling rises and the floor applied to `max_load`.
pub const LOAD_STEP: u32 = 10;

/// State of one worker slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerRecord {
    /// Whether a worker session currently owns this slot.
    pub connected: bool,
    /// Host portion of the worker's peer address.
    pub address: String,
    /// Listening port advertised by the worker.
    pub port: String,
    /// Client count last reported by the worker.
    pub load: u32,
}

impl WorkerRecord {
    /// A freshly claimed slot for a worker connecting from `address`.
    pub fn connected(address: IpAddr) -> Self {
        Self {
            connected: true,
            address: address.to_string(),
            port: String::new(),
            load: 0,
        }
    }

    /// Clear every field, returning the slot to the free pool.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `address:port` as handed to clients, or `None` while the slot is free
    /// or the worker has not advertised its port yet.
    ///
    /// IPv6 hosts are bracketed so the result parses as a socket address.
    pub fn endpoint(&self) -> Option<String> {
        if !self.connected || self.port.is_empty() {
            return None;
        }
        match self.address.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => Some(format!("[{v6}]:{}", self.port)),
            _ => Some(format!("{}:{}", self.address, self.port)),
        }
    }
}

impl fmt::Display for WorkerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} {} {} {}}}",
            self.connected, self.address, self.port, self.load
        )
    }
}
