//! Input checks for server profile fields.
//!
//! These run before any value reaches the network layer: the interactive
//! connection test calls them directly and [`crate::profile::ServerProfile::validate`]
//! applies all three to a profile.

use std::sync::LazyLock;

/// Four dot-separated groups, each either `2xx` or an optional leading `0`/`1` followed by
/// one or two digits.
///
/// This accepts values outside 0-255 (`299.299.299.299` passes) and is kept that way so that
/// existing registries keep validating exactly as before.
pub const HOST_PATTERN: &str = r"^(2[0-9]{2}|[01]?[0-9]{1,2})(\.(2[0-9]{2}|[01]?[0-9]{1,2})){3}$";

static HOST_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(HOST_PATTERN).expect("host pattern is a valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name required")]
    NameRequired,
    #[error("host required")]
    HostRequired,
    #[error("host invalid")]
    HostInvalid,
    #[error("port required")]
    PortRequired,
    #[error("port invalid")]
    PortInvalid,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn validate_name(value: &str) -> Result<(), ValidationError> {
    if is_blank(value) {
        return Err(ValidationError::NameRequired);
    }
    Ok(())
}

pub fn validate_host(value: &str) -> Result<(), ValidationError> {
    if is_blank(value) {
        return Err(ValidationError::HostRequired);
    }
    if !HOST_REGEX.is_match(value) {
        return Err(ValidationError::HostInvalid);
    }
    Ok(())
}

/// Accepts anything that parses as a signed 32-bit integer; the TCP port range is
/// only enforced when connecting.
pub fn validate_port(value: &str) -> Result<(), ValidationError> {
    if is_blank(value) {
        return Err(ValidationError::PortRequired);
    }
    value
        .parse::<i32>()
        .map(|_| ())
        .map_err(|_| ValidationError::PortInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn name_must_not_be_blank() {
        assert_eq!(validate_name("build-mirror"), Ok(()));
        assert_eq!(validate_name(""), Err(ValidationError::NameRequired));
        assert_eq!(validate_name("  \t"), Err(ValidationError::NameRequired));
    }

    #[test]
    fn host_accepts_dotted_quads() {
        assert_eq!(validate_host("192.168.1.1"), Ok(()));
        assert_eq!(validate_host("10.0.0.254"), Ok(()));
        assert_eq!(validate_host("0.0.0.0"), Ok(()));
        assert_eq!(validate_host("001.02.3.255"), Ok(()));
    }

    #[test]
    fn host_pattern_admits_out_of_range_groups() {
        // known validation gap: groups 256-299 pass
        assert_eq!(validate_host("299.299.299.299"), Ok(()));
        assert_eq!(validate_host("256.1.1.1"), Ok(()));
    }

    #[test]
    fn host_rejects_malformed_values() {
        assert_eq!(validate_host(""), Err(ValidationError::HostRequired));
        assert_eq!(validate_host("   "), Err(ValidationError::HostRequired));
        assert_eq!(validate_host("abc"), Err(ValidationError::HostInvalid));
        assert_eq!(validate_host("300.1.1.1"), Err(ValidationError::HostInvalid));
        assert_eq!(validate_host("1.2.3"), Err(ValidationError::HostInvalid));
        assert_eq!(validate_host("1.2.3.4.5"), Err(ValidationError::HostInvalid));
        assert_eq!(validate_host("1.2.3.4 "), Err(ValidationError::HostInvalid));
        assert_eq!(validate_host("ftp.example.com"), Err(ValidationError::HostInvalid));
        assert_eq!(validate_host("1.2.3.1234"), Err(ValidationError::HostInvalid));
    }

    #[test]
    fn port_checks_integer_shape_only() {
        assert_eq!(validate_port("21"), Ok(()));
        assert_eq!(validate_port("999999"), Ok(()));
        assert_eq!(validate_port("-1"), Ok(()));
        assert_eq!(validate_port("abc"), Err(ValidationError::PortInvalid));
        assert_eq!(validate_port("21.5"), Err(ValidationError::PortInvalid));
        assert_eq!(validate_port("99999999999"), Err(ValidationError::PortInvalid));
        assert_eq!(validate_port(""), Err(ValidationError::PortRequired));
        assert_eq!(validate_port(" "), Err(ValidationError::PortRequired));
    }

    #[test]
    fn messages_match_form_errors() {
        assert_eq!(ValidationError::HostInvalid.to_string(), "host invalid");
        assert_eq!(ValidationError::PortRequired.to_string(), "port required");
    }

    proptest! {
        #[test]
        fn any_quad_of_small_groups_is_accepted(a in 0u16..300, b in 0u16..300, c in 0u16..300, d in 0u16..300) {
            let host = format!("{a}.{b}.{c}.{d}");
            prop_assert_eq!(validate_host(&host), Ok(()));
        }

        #[test]
        fn groups_of_300_and_above_are_rejected(a in 300u16..1000, b in 0u16..256) {
            let host = format!("{a}.{b}.{b}.{b}");
            prop_assert_eq!(validate_host(&host), Err(ValidationError::HostInvalid));
        }

        #[test]
        fn every_i32_is_a_valid_port(port in any::<i32>()) {
            prop_assert_eq!(validate_port(&port.to_string()), Ok(()));
        }
    }
}
