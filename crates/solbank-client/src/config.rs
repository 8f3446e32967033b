//! Client settings and actor loading.

use std::time::Duration;

use solbank_sdk::{Keypair, Pubkey, SOLBANK_PROGRAM_ID};

use crate::error::ConfigError;
use crate::funding::FundingPolicy;
use crate::rpc::{Commitment, RpcUrl};

pub const MINT_PRIVATE_KEY: &str = "MINT_PRIVATE_KEY";
pub const TOKEN_AUTH_PRIVATE_KEY: &str = "TOKEN_AUTH_PRIVATE_KEY";
pub const USER_PRIVATE_KEY: &str = "USER_PRIVATE_KEY";
pub const USDT_MINT: &str = "USDT_MINT";

/// Settings shared by every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub rpc_url: RpcUrl,
    pub commitment: Commitment,
    pub program_id: Pubkey,
    pub funding: FundingPolicy,
    /// How long to wait for a submitted transaction to reach `commitment`.
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: RpcUrl::Localnet,
            commitment: Commitment::Confirmed,
            program_id: SOLBANK_PROGRAM_ID,
            funding: FundingPolicy::default(),
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    pub fn new(rpc_url: RpcUrl) -> Self {
        Self {
            rpc_url,
            ..Self::default()
        }
    }

    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }
}

/// The signing roles used by the operational commands.
///
/// Each role is read on demand, so a command only requires the variables it
/// actually uses.
pub struct Actors<F> {
    lookup: F,
}

impl Actors<fn(&str) -> Option<String>> {
    /// Read roles from the process environment.
    pub fn from_env() -> Self {
        Self {
            lookup: env_lookup,
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl<F> Actors<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn from_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    /// Pays for mint creation (`MINT_PRIVATE_KEY`).
    pub fn mint_payer(&self) -> Result<Keypair, ConfigError> {
        self.keypair(MINT_PRIVATE_KEY)
    }

    /// Mint and freeze authority (`TOKEN_AUTH_PRIVATE_KEY`).
    pub fn token_authority(&self) -> Result<Keypair, ConfigError> {
        self.keypair(TOKEN_AUTH_PRIVATE_KEY)
    }

    /// The vault user (`USER_PRIVATE_KEY`).
    pub fn user(&self) -> Result<Keypair, ConfigError> {
        self.keypair(USER_PRIVATE_KEY)
    }

    /// The test token mint (`USDT_MINT`).
    pub fn usdt_mint(&self) -> Result<Pubkey, ConfigError> {
        let value = self.var(USDT_MINT)?;
        value.trim().parse().map_err(|e| invalid(USDT_MINT, e))
    }

    fn keypair(&self, name: &str) -> Result<Keypair, ConfigError> {
        let value = self.var(name)?;
        Keypair::from_base58_secret(&value).map_err(|e| invalid(name, e))
    }

    fn var(&self, name: &str) -> Result<String, ConfigError> {
        (self.lookup)(name)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
    }
}

fn invalid(name: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidVar {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
