// src/payload.rs

//! Payload extraction from received frames.
//!
//! Forwarders publish records as `<topic><delimiter><payload>` in a single
//! frame. The delimiter is searched from the start of the frame and the
//! payload is everything strictly after its first occurrence.

use bytes::Bytes;

/// Marker preceding the JSON body of a CEE-enhanced syslog line.
pub const CEE_MARKER: &str = "@cee:";

/// Index of the first occurrence of `delimiter` in `frame`, if any.
pub fn find_delimiter(frame: &[u8], delimiter: &[u8]) -> Option<usize> {
    // ---
    if delimiter.is_empty() || delimiter.len() > frame.len() {
        return None;
    }

    frame
        .windows(delimiter.len())
        .position(|window| window == delimiter)
}

/// Strip the topic prefix from `frame`.
///
/// Without a delimiter, or when the delimiter never occurs, the frame is
/// returned unchanged. The returned `Bytes` shares the frame's storage.
pub fn strip_topic(frame: &Bytes, delimiter: Option<&str>) -> Bytes {
    // ---
    let delimiter = match delimiter {
        Some(d) if !d.is_empty() => d.as_bytes(),
        _ => return frame.clone(),
    };

    match find_delimiter(frame, delimiter) {
        Some(idx) => frame.slice(idx + delimiter.len()..),
        None => frame.clone(),
    }
}

/// The structured part of a CEE log line: everything after [`CEE_MARKER`].
pub fn cee_payload(line: &str) -> Option<&str> {
    line.split_once(CEE_MARKER).map(|(_, json)| json)
}
