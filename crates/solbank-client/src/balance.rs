//! Token balance queries.
//!
//! An account that does not exist yet reads as a zero balance.

use std::fmt;

use solbank_sdk::spl_token::TokenAccount;
use solbank_sdk::{derive_associated_token_address, Pubkey, TOKEN_PROGRAM_ID};
use tracing::warn;

use crate::error::RpcError;
use crate::rpc::RpcConnection;

/// Fetch and decode a token account, `None` if it does not exist.
pub async fn fetch_token_account<R>(
    rpc: &R,
    address: &Pubkey,
) -> Result<Option<TokenAccount>, RpcError>
where
    R: RpcConnection + ?Sized,
{
    match rpc.get_account(address).await? {
        Some(account) => Ok(Some(TokenAccount::unpack(&account.data)?)),
        None => Ok(None),
    }
}

/// Raw token balance of `token_account`.
pub async fn token_balance<R>(rpc: &R, token_account: &Pubkey) -> Result<u64, RpcError>
where
    R: RpcConnection + ?Sized,
{
    match fetch_token_account(rpc, token_account).await? {
        Some(account) => Ok(account.amount),
        None => {
            warn!(%token_account, "token account does not exist, reading balance as 0");
            Ok(0)
        }
    }
}

/// Raw token balance of `owner`'s associated token account for `mint`.
pub async fn owner_token_balance<R>(rpc: &R, owner: &Pubkey, mint: &Pubkey) -> Result<u64, RpcError>
where
    R: RpcConnection + ?Sized,
{
    let ata = derive_associated_token_address(owner, mint, &TOKEN_PROGRAM_ID)?;
    token_balance(rpc, &ata).await
}

/// A balance observed before and after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    pub before: u64,
    pub after: u64,
}

impl BalanceDelta {
    pub fn signed_change(&self) -> i128 {
        i128::from(self.after) - i128::from(self.before)
    }
}

impl fmt::Display for BalanceDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({:+})",
            self.before,
            self.after,
            self.signed_change()
        )
    }
}
