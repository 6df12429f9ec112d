//! Recipient-string parsing.

use std::collections::HashSet;

use mailrelay_graph::Recipient;

/// Splits a recipient string on `;` and `,` into unique recipients.
///
/// Entries are trimmed and empty ones dropped. `Name <addr>` yields a named
/// recipient. Duplicates are compared case-insensitively by address and
/// the first occurrence wins, so order is preserved.
pub fn parse_recipients(input: &str) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    input
        .split([';', ','])
        .filter_map(parse_entry)
        .filter(|r| seen.insert(r.address().to_lowercase()))
        .collect()
}

/// Parses one list entry.
fn parse_entry(entry: &str) -> Option<Recipient> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }

    if let Some((name, rest)) = entry.split_once('<')
        && let Some(address) = rest.strip_suffix('>')
    {
        let address = address.trim();
        if address.is_empty() {
            return None;
        }
        let name = name.trim().trim_matches('"').trim();
        let name = (!name.is_empty()).then(|| name.to_string());
        return Some(Recipient::new(address, name));
    }

    Some(Recipient::new(entry, None))
}
