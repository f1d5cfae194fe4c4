//! Original-client address inference from `X-Forwarded-For`.
//!
//! # Rules
//! - Entries are comma separated and whitespace trimmed, leftmost first
//! - First entry that parses as an IP and is not private/reserved wins
//! - Otherwise the first entry is returned verbatim, parseable or not
//! - No header (or a blank one) means the connecting address

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::diagnostics::snapshot::RequestSnapshot;

/// IPv4 ranges treated as private or reserved.
const PRIVATE_V4: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 0, 0, 0), 24),
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    (Ipv4Addr::new(240, 0, 0, 0), 4),
    (Ipv4Addr::new(255, 255, 255, 255), 32),
];

/// IPv6 ranges treated as private or reserved. IPv4-mapped addresses are
/// judged by their embedded IPv4 address instead.
const PRIVATE_V6: &[(Ipv6Addr, u8)] = &[
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1), 128),
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0), 128),
    (Ipv6Addr::new(0x64, 0xff9b, 1, 0, 0, 0, 0, 0), 48),
    (Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 0), 64),
    (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 23),
    (Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32),
    (Ipv6Addr::new(0x2002, 0, 0, 0, 0, 0, 0, 0), 16),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
];

fn in_v4_network(ip: Ipv4Addr, network: Ipv4Addr, prefix: u8) -> bool {
    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    u32::from(ip) & mask == u32::from(network)
}

fn in_v6_network(ip: Ipv6Addr, network: Ipv6Addr, prefix: u8) -> bool {
    let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
    u128::from(ip) & mask == u128::from(network)
}

/// True for loopback, RFC 1918, link-local, documentation, benchmarking,
/// unique-local and other non-routable addresses.
pub fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => PRIVATE_V4
            .iter()
            .any(|&(network, prefix)| in_v4_network(v4, network, prefix)),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private(IpAddr::V4(v4)),
            None => PRIVATE_V6
                .iter()
                .any(|&(network, prefix)| in_v6_network(v6, network, prefix)),
        },
    }
}

/// Best guess at the original client address for `forwarded_for`, falling
/// back to `connecting_address`.
pub fn infer_from_forwarded_for(forwarded_for: Option<&str>, connecting_address: &str) -> String {
    let Some(header) = forwarded_for.map(str::trim).filter(|h| !h.is_empty()) else {
        return connecting_address.to_string();
    };

    let candidates: Vec<&str> = header.split(',').map(str::trim).collect();

    let public = candidates.iter().find(|candidate| {
        candidate
            .parse::<IpAddr>()
            .map(|ip| !is_private(ip))
            .unwrap_or(false)
    });

    match public.or_else(|| candidates.first()) {
        Some(candidate) => candidate.to_string(),
        None => connecting_address.to_string(),
    }
}

/// Infer the original client address of a request.
pub fn infer_client_address(snapshot: &RequestSnapshot) -> String {
    infer_from_forwarded_for(snapshot.forwarded_for(), &snapshot.connecting_address)
}
