//! IPv4 broadcast address enumeration and the capped exponential backoff
//! used by both discovery and request retry.

use crate::error::DiscoError;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Returns the broadcast address of every non-loopback IPv4 interface on
/// this host, each paired with the LIFX LAN protocol port.
pub fn ipv4_broadcast_addrs() -> Result<Vec<SocketAddr>, DiscoError> {
    let ifaces = if_addrs::get_if_addrs()
        .map_err(|e| DiscoError::Transport(format!("enumerate interfaces: {e}")))?;

    let mut addrs = Vec::new();
    for iface in ifaces {
        if iface.is_loopback() {
            continue;
        }
        let if_addrs::IfAddr::V4(v4) = iface.addr else {
            continue;
        };
        let broadcast = v4.broadcast.unwrap_or_else(|| {
            let ip = u32::from(v4.ip);
            let mask = u32::from(v4.netmask);
            Ipv4Addr::from(ip | !mask)
        });
        addrs.push(SocketAddr::new(broadcast.into(), 56700));
    }
    Ok(addrs)
}

/// A capped exponential backoff: `t0, t0*2, t0*4, ...` up to `cap`,
/// thereafter holding at `cap`. Matches the original's `backoff(t0, t1)`.
pub struct Backoff {
    next: u64,
    cap: u64,
}

impl Backoff {
    pub fn new(first_ms: u64, cap_ms: u64) -> Backoff {
        Backoff {
            next: first_ms,
            cap: cap_ms,
        }
    }

    pub fn next(&mut self) -> Duration {
        if self.next > self.cap {
            return Duration::from_millis(self.cap);
        }
        let t = self.next;
        self.next = self.next.saturating_mul(2);
        Duration::from_millis(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let mut b = Backoff::new(1, 100);
        let seq: Vec<u64> = (0..8).map(|_| b.next().as_millis() as u64).collect();
        assert_eq!(seq, vec![1, 2, 4, 8, 16, 32, 64, 100]);
    }
}
