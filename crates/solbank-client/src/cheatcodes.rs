//! Local test-validator state overrides (`surfnet_*` methods).

use serde::Serialize;
use serde_json::json;
use solbank_sdk::Pubkey;
use tracing::info;

use crate::error::RpcError;
use crate::rpc::{is_loopback_url, RawRpc, RpcConnection};

/// Raw account contents to write at an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountOverride {
    pub lamports: u64,
    pub data: Vec<u8>,
    pub owner: Pubkey,
    pub executable: bool,
}

#[derive(Serialize)]
struct AccountOverrideParams {
    lamports: u64,
    data: String,
    owner: String,
    executable: bool,
}

/// Fields to set on an owner's associated token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenAccountOverride {
    pub amount: u64,
}

/// Handle to the cheat-code methods of a local validator.
pub struct CheatCodes<'a, R: ?Sized> {
    rpc: &'a R,
}

impl<'a, R> CheatCodes<'a, R>
where
    R: RpcConnection + RawRpc + ?Sized,
{
    /// Fails unless `rpc` points at a loopback host.
    pub fn new(rpc: &'a R) -> Result<Self, RpcError> {
        if !is_loopback_url(rpc.url()) {
            return Err(RpcError::CheatCodesUnavailable(rpc.url().to_string()));
        }
        Ok(Self { rpc })
    }

    pub fn rpc(&self) -> &'a R {
        self.rpc
    }

    /// Overwrite the account at `address`.
    pub async fn set_account(
        &self,
        address: &Pubkey,
        account: &AccountOverride,
    ) -> Result<(), RpcError> {
        let params = AccountOverrideParams {
            lamports: account.lamports,
            data: hex::encode(&account.data),
            owner: account.owner.to_string(),
            executable: account.executable,
        };
        info!(%address, lamports = account.lamports, len = account.data.len(), "surfnet_setAccount");
        self.rpc
            .call("surfnet_setAccount", json!([address.to_string(), params]))
            .await?;
        Ok(())
    }

    /// Set fields of `owner`'s token account for `mint`, creating it if needed.
    pub async fn set_token_account(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        update: &TokenAccountOverride,
        token_program: &Pubkey,
    ) -> Result<(), RpcError> {
        info!(%owner, %mint, amount = update.amount, "surfnet_setTokenAccount");
        self.rpc
            .call(
                "surfnet_setTokenAccount",
                json!([
                    owner.to_string(),
                    mint.to_string(),
                    update,
                    token_program.to_string()
                ]),
            )
            .await?;
        Ok(())
    }
}
