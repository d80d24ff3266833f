//! Sending sockets

use crate::error::Result;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Hop limit for multicast sends, enough to cross a Thread mesh
const MULTICAST_HOPS: u32 = 16;

/// Opens a UDP socket for sending to `target`.
///
/// The socket is bound to the unspecified address of the target's family.
/// IPv6 multicast targets get a hop limit of [`MULTICAST_HOPS`].
pub(crate) fn open_for(target: SocketAddr) -> Result<UdpSocket> {
    let (domain, local_addr) = match target {
        SocketAddr::V4(_) => (Domain::IPV4, SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))),
        SocketAddr::V6(_) => (Domain::IPV6, SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))),
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if target.is_ipv6() && target.ip().is_multicast() {
        socket.set_multicast_hops_v6(MULTICAST_HOPS)?;
    }

    // Set socket to non-blocking for tokio
    socket.set_nonblocking(true)?;
    socket.bind(&local_addr.into())?;

    Ok(UdpSocket::from_std(socket.into())?)
}
