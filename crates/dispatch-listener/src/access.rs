//! Source-address lists, read-only after startup.

use std::collections::HashSet;
use std::net::IpAddr;

/// A set of host addresses. Used as the worker allow-list and the client
/// deny-list.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    hosts: HashSet<IpAddr>,
}

impl AccessList {
    pub fn new(hosts: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            hosts: hosts.into_iter().map(|ip| ip.to_canonical()).collect(),
        }
    }

    pub fn contains(&self, host: &IpAddr) -> bool {
        self.hosts.contains(&host.to_canonical())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn matches_host_only() {
        let list = AccessList::new([ip("10.0.0.1"), ip("10.0.0.2")]);
        assert!(list.contains(&ip("10.0.0.1")));
        assert!(!list.contains(&ip("10.0.0.3")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn mapped_ipv6_matches_ipv4_entry() {
        let list = AccessList::new([ip("127.0.0.1")]);
        assert!(list.contains(&ip("::ffff:127.0.0.1")));
    }

    #[test]
    fn empty_list_matches_nothing() {
        let list = AccessList::default();
        assert!(list.is_empty());
        assert!(!list.contains(&ip("127.0.0.1")));
    }
}
