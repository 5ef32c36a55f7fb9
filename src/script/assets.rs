use crate::error::{FlavorError, Result};

pub const INIT_SSL_CA: &str = "init-ssl-ca";
pub const INIT_SSL: &str = "init-ssl";

static ASSETS: &[(&str, &str)] = &[
    (INIT_SSL_CA, include_str!("../../scripts/init-ssl-ca")),
    (INIT_SSL, include_str!("../../scripts/init-ssl")),
];

/// A provisioning script compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    pub name: &'static str,
    pub body: &'static str,
}

impl Script {
    pub fn lookup(name: &str) -> Result<Script> {
        ASSETS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(name, body)| Script { name, body })
            .ok_or_else(|| FlavorError::MissingAsset(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_matching_body() {
        let ca = Script::lookup(INIT_SSL_CA).unwrap();
        let issue = Script::lookup(INIT_SSL).unwrap();
        assert_ne!(ca.body, issue.body);
        assert!(ca.body.starts_with("#!/bin/bash"));
        assert!(issue.body.contains("tar -cf"));
    }

    #[test]
    fn unknown_asset() {
        let err = Script::lookup("init-etcd").unwrap_err();
        assert!(matches!(err, FlavorError::MissingAsset(ref n) if n == "init-etcd"));
    }
}
