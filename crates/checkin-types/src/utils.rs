//! String formatting utilities for log and outcome lines.

use crate::TransactionHash;

/// Truncates a hex string for display, keeping the first 10 characters.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Renders a transaction as an explorer link, or as the bare hash when no
/// explorer is configured.
pub fn explorer_link(explorer_url: Option<&str>, hash: &TransactionHash) -> String {
	match explorer_url {
		Some(prefix) if !prefix.is_empty() => format!("{}{}", prefix, hash),
		_ => hash.to_string(),
	}
}
