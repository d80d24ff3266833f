//! IPv6 multicast group membership

use crate::error::Result;
use otcoap_core::config::MulticastConfig;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::Ipv6Addr;
use tracing::{debug, info, warn};

/// Membership of one IPv6 multicast group.
///
/// The group is left when the subscription is dropped.
#[derive(Debug)]
pub struct MulticastSubscription {
    socket: Socket,
    group: Ipv6Addr,
    interface: u32,
    joined: bool,
}

impl MulticastSubscription {
    /// Joins `config.group` on `config.interface` (0 lets the kernel pick).
    pub fn join(config: &MulticastConfig) -> Result<Self> {
        config.validate()?;

        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_only_v6(true)?;
        socket.join_multicast_v6(&config.group, config.interface)?;

        info!(
            group = %config.group,
            interface = config.interface,
            "Joined IPv6 multicast group"
        );

        Ok(Self {
            socket,
            group: config.group,
            interface: config.interface,
            joined: true,
        })
    }

    pub fn group(&self) -> Ipv6Addr {
        self.group
    }

    pub fn interface(&self) -> u32 {
        self.interface
    }

    /// Leaves the group, reporting any failure.
    pub fn leave(mut self) -> Result<()> {
        self.joined = false;
        self.socket.leave_multicast_v6(&self.group, self.interface)?;
        info!(group = %self.group, "Left IPv6 multicast group");
        Ok(())
    }
}

impl Drop for MulticastSubscription {
    fn drop(&mut self) {
        if !self.joined {
            return;
        }
        match self.socket.leave_multicast_v6(&self.group, self.interface) {
            Ok(()) => debug!(group = %self.group, "Left IPv6 multicast group on drop"),
            Err(e) => warn!(group = %self.group, error = %e, "Failed to leave multicast group"),
        }
    }
}
