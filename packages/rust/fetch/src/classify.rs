//! Heuristic classification of fetch failures.
//!
//! The fetch backend offers no structured "blocked" signal, so policy blocks
//! are recognized by substring matching on the failure message. False
//! negatives (real blocks not recognized) are an accepted limitation of this
//! approach, not a bug.

use evidencer_shared::EvidencerError;

/// Substrings (lowercase) that indicate a firewall-style content-policy block.
const BLOCK_MARKERS: &[&str] = &["firewall", "blocked"];

/// Coarse failure category for a fetch error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureKind {
    /// The fetch was refused by an external content policy.
    BlockedByPolicy,
    /// Any other fetch failure.
    Other,
}

/// Classify a raw fetch failure message.
///
/// Pure and independent of the network layer; matching is case-insensitive.
pub fn classify(message: &str) -> FetchFailureKind {
    let lowered = message.to_lowercase();
    if BLOCK_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        FetchFailureKind::BlockedByPolicy
    } else {
        FetchFailureKind::Other
    }
}

/// Upgrade a generic fetch error to a policy-block error when its message
/// matches the block heuristics. Non-fetch errors pass through untouched.
pub fn refine(error: EvidencerError) -> EvidencerError {
    match error {
        EvidencerError::Fetch(message) => match classify(&message) {
            FetchFailureKind::BlockedByPolicy => EvidencerError::BlockedByPolicy(message),
            FetchFailureKind::Other => EvidencerError::Fetch(message),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_firewall_marker() {
        assert_eq!(
            classify("request denied by corporate firewall"),
            FetchFailureKind::BlockedByPolicy
        );
    }

    #[test]
    fn detects_blocked_marker_case_insensitively() {
        assert_eq!(
            classify("HTTP 403: domain BLOCKED by proxy"),
            FetchFailureKind::BlockedByPolicy
        );
        assert_eq!(
            classify("Firewall rules rejected the connection"),
            FetchFailureKind::BlockedByPolicy
        );
    }

    #[test]
    fn other_failures_are_not_blocks() {
        assert_eq!(classify("connection timed out"), FetchFailureKind::Other);
        assert_eq!(classify("HTTP 500"), FetchFailureKind::Other);
        assert_eq!(classify(""), FetchFailureKind::Other);
    }

    #[test]
    fn refine_upgrades_matching_fetch_errors() {
        let refined = refine(EvidencerError::Fetch("blocked by filter".into()));
        assert!(matches!(refined, EvidencerError::BlockedByPolicy(_)));
        assert_eq!(refined.exit_code(), 2);
    }

    #[test]
    fn refine_keeps_generic_fetch_errors() {
        let refined = refine(EvidencerError::Fetch("dns lookup failed".into()));
        assert!(matches!(refined, EvidencerError::Fetch(_)));
        assert_eq!(refined.exit_code(), 1);
    }

    #[test]
    fn refine_passes_through_non_fetch_errors() {
        let refined = refine(EvidencerError::Persist("blocked device".into()));
        // Persist errors are never policy blocks, even with a matching message.
        assert!(matches!(refined, EvidencerError::Persist(_)));
    }
}
