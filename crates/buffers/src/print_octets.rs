//! Hex formatting of byte runs for error messages.

/// Formats a byte slice as space-separated hex, showing at most `max` bytes.
///
/// # Example
///
/// ```
/// use plist_pack_buffers::print_octets;
///
/// assert_eq!(print_octets(b"bplist", 16), "62 70 6c 69 73 74");
/// assert_eq!(print_octets(&[1, 2, 3], 2), "01 02... (1 more)");
/// assert_eq!(print_octets(&[], 16), "");
/// ```
pub fn print_octets(octets: &[u8], max: usize) -> String {
    let mut result = octets
        .iter()
        .take(max)
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ");
    if octets.len() > max {
        result.push_str(&format!("... ({} more)", octets.len() - max));
    }
    result
}
