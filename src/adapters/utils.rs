//! Shared helpers for adapter-layer logging.
//!
//! Inbound BLE payloads may carry credentials, so adapters log at most the
//! command prefix and the length, never the value itself.

use crate::app::commands::PREFIX_LEN;

/// Returns `true` if every byte is in the printable ASCII range
/// `0x20..=0x7E`.
pub(super) fn is_printable_ascii(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| (0x20..=0x7E).contains(b))
}

/// Render the command prefix of `raw` for a log line.  Non-printable bytes
/// become `.`.
pub(super) fn prefix_preview(raw: &[u8]) -> heapless::String<PREFIX_LEN> {
    let mut out = heapless::String::new();
    for &b in raw.iter().take(PREFIX_LEN) {
        let c = if is_printable_ascii(&[b]) { b as char } else { '.' };
        // Capacity equals the number of bytes taken.
        let _ = out.push(c);
    }
    out
}
