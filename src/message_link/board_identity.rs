use itertools::Itertools;
use std::path::Path;

/// Interfaces whose hardware address may name the board, in order of preference.
const MAC_INTERFACES: [&str; 4] = ["en0", "wl0", "eth0", "wlan0"];

/// Derives the board identity from the first usable MAC address.
pub(super) fn mac_board_id() -> Option<String> { mac_board_id_in(Path::new("/sys/class/net")) }

/// Looks up `<root>/<interface>/address` for every candidate interface.
pub(super) fn mac_board_id_in(root: &Path) -> Option<String> {
    MAC_INTERFACES.iter().find_map(|iface| {
        let raw = std::fs::read_to_string(root.join(iface).join("address")).ok()?;
        normalize_mac(raw.trim())
    })
}

/// Formats a MAC address as six lowercase `xx` octets joined by `:`.
fn normalize_mac(raw: &str) -> Option<String> {
    let octets = raw
        .split(':')
        .map(|o| u8::from_str_radix(o, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    if octets.len() != 6 {
        return None;
    }
    Some(octets.iter().map(|o| format!("{o:02x}")).join(":"))
}
