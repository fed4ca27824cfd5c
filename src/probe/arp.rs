/*!
Tolerant parsing of `arp -a` style output into structured rows. The engine
never runs the command itself; adapters feed it the captured text (or build
the rows directly). Unparsable lines are skipped, never fatal.
*/

use tracing::debug;

/// One parsed row of an ARP table dump, in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArpRow {
    /// An `Interface: 192.168.1.10 --- 0xb` header line; the value is the
    /// interface address with the index suffix stripped.
    Interface(String),
    Entry(ArpEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpEntry {
    pub address: String,
    pub hardware_address: String,
    /// `dynamic`, `static`, etc., as printed by the OS.
    pub entry_type: String,
}

/// Parses raw ARP output. Header lines, blank lines and anything else that
/// does not look like an entry are ignored.
pub fn parse_arp_table(output: &str) -> Vec<ArpRow> {
    let mut rows = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.contains("Internet Address") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("Interface:") {
            // "Interface: 192.168.1.10 --- 0xb" -> "192.168.1.10"
            let name = rest.split("---").next().unwrap_or("").trim();
            if !name.is_empty() {
                rows.push(ArpRow::Interface(name.to_string()));
            }
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() >= 3 {
            rows.push(ArpRow::Entry(ArpEntry {
                address: tokens[0].to_string(),
                hardware_address: tokens[1].to_string(),
                entry_type: tokens[2].to_string(),
            }));
        } else {
            debug!(line, "skipping unparsable ARP line");
        }
    }
    rows
}

/// Whether `s` looks like a MAC address: six two-digit hex groups separated
/// by `:` or `-`.
pub fn is_hardware_address(s: &str) -> bool {
    let groups: Vec<&str> = s.split(['-', ':']).collect();
    groups.len() == 6
        && groups
            .iter()
            .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_hexdigit()))
}
