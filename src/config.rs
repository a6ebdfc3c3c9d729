//! Node settings, read from an optional TOML file

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::blockchain::{Address, GenesisAllocation, HashScheme, ProofOfWork};

/// Address credited in genesis on a default currency ledger
pub const DEFAULT_FAUCET_ADDRESS: &str = "22CrG4hSL3UPvzGumC5aTBD8ujmn";

/// Amount credited to the faucet in genesis
pub const DEFAULT_FAUCET_AMOUNT: i64 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_variant")]
    pub variant: HashScheme,

    /// Leading zero hex digits; the variant's default when unset
    #[serde(default)]
    pub difficulty: Option<usize>,

    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,

    /// Peer URLs registered at startup
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    /// Genesis credits besides the node wallet's own
    #[serde(default = "default_genesis")]
    pub genesis: Vec<GenesisAllocation>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: default_host(),
            port: default_port(),
            variant: default_variant(),
            difficulty: None,
            peer_timeout_secs: default_peer_timeout_secs(),
            bootstrap_peers: Vec::new(),
            genesis: default_genesis(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_variant() -> HashScheme {
    HashScheme::Currency
}

fn default_peer_timeout_secs() -> u64 {
    10
}

fn default_genesis() -> Vec<GenesisAllocation> {
    vec![GenesisAllocation::new(
        Address::from(DEFAULT_FAUCET_ADDRESS),
        DEFAULT_FAUCET_AMOUNT,
    )]
}

impl Settings {
    /// Reads settings from `path`, or returns the defaults when no path is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Settings> {
        let settings = match path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => Settings::default(),
        };

        settings.check()?;
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Settings> {
        Ok(toml::from_str(contents)?)
    }

    /// Rejects values no ledger can run with
    pub fn check(&self) -> anyhow::Result<()> {
        if self.difficulty.map_or(false, |difficulty| difficulty >= 64) {
            bail!("difficulty must be below 64 hex digits");
        }

        if let Some(allocation) = self.genesis.iter().find(|allocation| allocation.amount <= 0) {
            bail!(
                "genesis allocation to {} must be positive, got {}",
                allocation.address,
                allocation.amount
            );
        }

        if self.peer_timeout_secs == 0 {
            bail!("peer_timeout_secs must be at least 1");
        }

        Ok(())
    }

    pub fn proof_of_work(&self) -> ProofOfWork {
        let difficulty = self
            .difficulty
            .unwrap_or_else(|| self.variant.default_difficulty());
        ProofOfWork::new(self.variant, difficulty)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None).unwrap();

        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 5001);
        assert_eq!(settings.variant, HashScheme::Currency);
        assert_eq!(settings.proof_of_work().difficulty(), 5);
        assert_eq!(settings.peer_timeout(), Duration::from_secs(10));
        assert_eq!(
            settings.genesis,
            vec![GenesisAllocation::new(Address::from(DEFAULT_FAUCET_ADDRESS), 1000)]
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            port = 5002
            variant = "plain"
            bootstrap_peers = ["http://127.0.0.1:5001"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.port, 5002);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.proof_of_work(), ProofOfWork::new(HashScheme::Plain, 4));
        assert_eq!(settings.bootstrap_peers, vec!["http://127.0.0.1:5001"]);
        assert_eq!(settings.genesis.len(), 1);
    }

    #[test]
    fn test_genesis_allocations_from_file() {
        let settings = Settings::from_toml(
            r#"
            difficulty = 3

            [[genesis]]
            address = "alice"
            amount = 50

            [[genesis]]
            address = "bob"
            amount = 7
            "#,
        )
        .unwrap();

        assert_eq!(settings.proof_of_work(), ProofOfWork::new(HashScheme::Currency, 3));
        assert_eq!(settings.genesis.len(), 2);
        assert_eq!(settings.genesis[1], GenesisAllocation::new(Address::from("bob"), 7));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Settings::from_toml("variant = \"sha3\"").is_err());
        assert!(Settings::from_toml("prot = 5002").is_err());

        let settings = Settings::from_toml("difficulty = 64").unwrap();
        assert!(settings.check().is_err());

        let settings = Settings::from_toml(
            r#"
            [[genesis]]
            address = "alice"
            amount = 0
            "#,
        )
        .unwrap();
        assert!(settings.check().is_err());

        let settings = Settings::from_toml("peer_timeout_secs = 0").unwrap();
        assert!(settings.check().is_err());
    }

    #[test]
    fn test_missing_file() {
        let error = Settings::load(Some(Path::new("/nonexistent/noahcoin.toml"))).unwrap_err();
        assert!(error.to_string().contains("failed to read config file"));
    }
}
