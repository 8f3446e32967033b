//! Faucet top-ups for local and test networks.

use solbank_sdk::{Pubkey, Signature};
use tracing::info;

use crate::error::RpcError;
use crate::rpc::RpcConnection;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingPolicy {
    /// Top up when the balance is strictly below this.
    pub minimum_lamports: u64,
    /// Amount requested from the faucet.
    pub airdrop_lamports: u64,
}

impl Default for FundingPolicy {
    fn default() -> Self {
        Self {
            minimum_lamports: 2 * LAMPORTS_PER_SOL,
            airdrop_lamports: 2 * LAMPORTS_PER_SOL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingOutcome {
    AlreadyFunded { balance: u64 },
    ToppedUp { signature: Signature, lamports: u64 },
}

/// Make sure `address` holds at least `policy.minimum_lamports`.
///
/// Requests one airdrop and waits for it to confirm. Faucet errors are
/// returned as is.
pub async fn ensure_funded<R>(
    rpc: &R,
    address: &Pubkey,
    policy: &FundingPolicy,
) -> Result<FundingOutcome, RpcError>
where
    R: RpcConnection + ?Sized,
{
    let balance = rpc.get_balance(address).await?;
    if balance >= policy.minimum_lamports {
        return Ok(FundingOutcome::AlreadyFunded { balance });
    }

    info!(
        %address,
        balance,
        lamports = policy.airdrop_lamports,
        "requesting airdrop"
    );
    let signature = rpc.request_airdrop(address, policy.airdrop_lamports).await?;
    rpc.confirm_transaction(&signature).await?;

    Ok(FundingOutcome::ToppedUp {
        signature,
        lamports: policy.airdrop_lamports,
    })
}
