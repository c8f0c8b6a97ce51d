//! Utility functions for loading proxy lists.

use std::path::Path;

/// Read a proxy list from a file.
pub(crate) fn read_proxy_file(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_proxy_list(&content))
}

/// Parse text content into proxy addresses, one per line.
///
/// Blank lines and `#` comments are skipped. Addresses are not rewritten:
/// a bare `host:port` stays bare and is treated as a plain HTTP proxy later.
pub(crate) fn parse_proxy_list(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                None
            } else {
                Some(line.to_string())
            }
        })
        .collect()
}
