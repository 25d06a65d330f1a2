//! Property tests for target specification parsing

use proptest::prelude::*;
use sshstat_core::config::parse_target_spec;
use sshstat_core::error::ConfigError;

proptest! {
    /// Property: `user@host:port` parses back into its parts
    #[test]
    fn full_spec_parses(
        user in "[a-z_][a-z0-9_-]{0,15}",
        host in "[a-z][a-z0-9-]{0,20}(\\.[a-z]{2,6}){0,2}",
        port in 1u16..,
    ) {
        let target = parse_target_spec(&format!("{user}@{host}:{port}"), "fallback").unwrap();
        prop_assert_eq!(target.user, user);
        prop_assert_eq!(target.host, host);
        prop_assert_eq!(target.port, port);
    }

    /// Property: missing user and port fall back to the defaults
    #[test]
    fn defaults_apply(host in "[a-z][a-z0-9-]{0,20}") {
        let target = parse_target_spec(&host, "ops").unwrap();
        prop_assert_eq!(target.user, "ops");
        prop_assert_eq!(target.port, 22);
    }

    /// Property: ports outside 1-65535 are rejected as invalid ports
    #[test]
    fn out_of_range_port_rejected(port in 65_536u32..10_000_000) {
        let result = parse_target_spec(&format!("root@db1:{port}"), "ops");
        prop_assert!(matches!(result, Err(ConfigError::InvalidPort(_))));
    }

    /// Property: bracketed IPv6 literals keep their colons
    #[test]
    fn bracketed_ipv6(groups in prop::collection::vec("[0-9a-f]{1,4}", 3..8), port in 1u16..) {
        let host = groups.join(":");
        let target = parse_target_spec(&format!("root@[{host}]:{port}"), "ops").unwrap();
        prop_assert_eq!(target.host, host);
        prop_assert_eq!(target.port, port);
    }
}
