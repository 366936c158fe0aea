//! Default gateway discovery from the Linux routing table.

use std::net::Ipv4Addr;

/// Kernel IPv4 routing table.
pub const PROC_NET_ROUTE: &str = "/proc/net/route";

/// `RTF_GATEWAY` route flag.
const RTF_GATEWAY: u32 = 0x2;

/// Find the default gateway in `/proc/net/route` contents.
///
/// The table stores addresses as little-endian hex.
pub fn parse_default_gateway(table: &str) -> Option<Ipv4Addr> {
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || fields[1] != "00000000" {
            return None;
        }
        let flags = u32::from_str_radix(fields[3], 16).ok()?;
        if flags & RTF_GATEWAY == 0 {
            return None;
        }
        let raw = u32::from_str_radix(fields[2], 16).ok()?;
        Some(Ipv4Addr::from(raw.to_le_bytes()))
    })
}

/// Read the default gateway of this host, if one is configured.
pub fn default_gateway() -> Option<Ipv4Addr> {
    let table = std::fs::read_to_string(PROC_NET_ROUTE).ok()?;
    parse_default_gateway(&table)
}

/// Gateway API base URL for a router address.
pub fn gateway_base_url(addr: Ipv4Addr) -> String {
    format!("https://{}", addr)
}
