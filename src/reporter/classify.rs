//! Probe output classification
//!
//! `mdmclient dep nag` prints free-form text. The root-privilege message
//! anywhere in it means the probe never reached the API. Otherwise a
//! `Code=<integer>` marker means the API answered with an error (negative
//! codes come from the network layer) and its absence means the call went
//! through.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::types::Classification;

/// Message `mdmclient` prints when started without root
pub const PRIVILEGE_MARKER: &str = "Must run as root";

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Code=(-?\d+)").expect("code pattern is valid"))
}

/// Classify raw probe output
///
/// Returns [`Error::PrivilegeRequired`] if the privilege message appears
/// anywhere. Otherwise the first `Code=` marker decides.
pub fn classify(output: &str) -> Result<Classification> {
    if output.contains(PRIVILEGE_MARKER) {
        return Err(Error::PrivilegeRequired);
    }

    match code_pattern().captures(output).and_then(|c| c.get(1)) {
        Some(code) => Ok(Classification::ErrorCode(code.as_str().to_string())),
        None => Ok(Classification::Success),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_code() {
        let output = "Error Domain=CPProfileManager Code=34006 \"The DEP service is unavailable\"";
        assert_eq!(
            classify(output).unwrap(),
            Classification::ErrorCode("34006".to_string())
        );
    }

    #[test]
    fn test_other_code_is_forwarded() {
        let output = "[ERROR] Request failed: Code=12345 UserInfo={...}";
        assert_eq!(
            classify(output).unwrap(),
            Classification::ErrorCode("12345".to_string())
        );
    }

    #[test]
    fn test_no_marker_is_success() {
        assert_eq!(
            classify("Sending DEP nag\nDone").unwrap(),
            Classification::Success
        );
        assert_eq!(classify("").unwrap(), Classification::Success);
    }

    #[test]
    fn test_code_without_digits_is_success() {
        assert_eq!(classify("Code= none").unwrap(), Classification::Success);
    }

    #[test]
    fn test_privilege_marker_is_fatal() {
        let result = classify("mdmclient: Must run as root\n");
        assert!(matches!(result, Err(Error::PrivilegeRequired)));
    }

    #[test]
    fn test_privilege_marker_beats_code() {
        assert!(matches!(
            classify("Must run as root (Code=1)"),
            Err(Error::PrivilegeRequired)
        ));
        assert!(matches!(
            classify("Code=34006\nMust run as root"),
            Err(Error::PrivilegeRequired)
        ));
    }

    #[test]
    fn test_negative_code_is_forwarded() {
        let output = "Error Domain=NSURLErrorDomain Code=-1009 \"The Internet connection appears to be offline.\"";
        assert_eq!(
            classify(output).unwrap(),
            Classification::ErrorCode("-1009".to_string())
        );
    }

    #[test]
    fn test_lone_minus_is_success() {
        assert_eq!(classify("Code=- n/a").unwrap(), Classification::Success);
    }

    #[test]
    fn test_first_code_wins() {
        assert_eq!(
            classify("Code=34006 then Code=500").unwrap(),
            Classification::ErrorCode("34006".to_string())
        );
    }
}
