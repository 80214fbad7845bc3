//! Port bookkeeping

use serde::{Deserialize, Serialize};

/// Ports a kernel is reachable on
///
/// Field names are the keys frontends expect in `connect_reply` and in
/// connection files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelPorts {
    /// Shell (request/reply) port
    pub xrep_port: u16,
    /// IOPub (broadcast) port
    pub pub_port: u16,
    /// Stdin (input request) port
    pub req_port: u16,
    /// Heartbeat port
    pub hb_port: u16,
}

impl KernelPorts {
    /// Creates a port set
    pub fn new(xrep_port: u16, pub_port: u16, req_port: u16, hb_port: u16) -> Self {
        Self {
            xrep_port,
            pub_port,
            req_port,
            hb_port,
        }
    }

    /// Returns whether every port is assigned
    pub fn is_complete(&self) -> bool {
        self.xrep_port != 0 && self.pub_port != 0 && self.req_port != 0 && self.hb_port != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_keys() {
        let ports = KernelPorts::new(5001, 5002, 5003, 5004);
        let value = serde_json::to_value(ports).unwrap();
        assert_eq!(
            value,
            json!({"xrep_port": 5001, "pub_port": 5002, "req_port": 5003, "hb_port": 5004})
        );
    }

    #[test]
    fn test_is_complete() {
        assert!(KernelPorts::new(1, 2, 3, 4).is_complete());
        assert!(!KernelPorts::new(1, 0, 3, 4).is_complete());
        assert!(!KernelPorts::default().is_complete());
    }
}
