//! End-to-end operations against a solbank deployment.
//!
//! Each flow is a straight pipeline: fund the acting wallet, derive the
//! addresses involved, read balances, submit, read balances again.

use solbank_sdk::solbank::{
    DepositTokenAccounts, InitializeAccounts, ProgramState, SolTransferAccounts,
    WithdrawTokenAccounts,
};
use solbank_sdk::spl_token::{self, TokenAccount, MINT_LEN, TOKEN_ACCOUNT_LEN};
use solbank_sdk::transaction::create_account;
use solbank_sdk::{
    derive_associated_token_address, Keypair, Pubkey, Signature, SolInstruction, TOKEN_PROGRAM_ID,
};
use tracing::{debug, info};

use crate::balance::{token_balance, BalanceDelta};
use crate::cheatcodes::{AccountOverride, CheatCodes, TokenAccountOverride};
use crate::config::ClientConfig;
use crate::error::RpcError;
use crate::funding::{ensure_funded, FundingPolicy};
use crate::rpc::{RawRpc, RpcConnection};
use crate::submit::submit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReport {
    pub mint: Pubkey,
    pub decimals: u8,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintToReport {
    pub token_account: Pubkey,
    pub signature: Signature,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeReport {
    pub program_state: Pubkey,
    pub vault: Pubkey,
    pub signature: Signature,
}

/// Result of a token deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransferReport {
    pub signature: Signature,
    pub vault: Pubkey,
    pub vault_token_account: Pubkey,
    pub user_token_account: Pubkey,
    pub vault_balance: BalanceDelta,
    pub user_balance: BalanceDelta,
}

/// Result of a SOL deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransferReport {
    pub signature: Signature,
    pub vault: Pubkey,
    pub vault_lamports: BalanceDelta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub token_account: Pubkey,
    pub balance: u64,
}

/// Create a fresh mint with `authority` as mint and freeze authority.
pub async fn create_mint<R>(
    rpc: &R,
    cfg: &ClientConfig,
    payer: &Keypair,
    authority: &Pubkey,
    decimals: u8,
) -> Result<MintReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    ensure_funded(rpc, &payer.pubkey(), &cfg.funding).await?;

    let mint = Keypair::generate();
    let rent = rpc.get_minimum_balance_for_rent_exemption(MINT_LEN).await?;
    let instructions = [
        create_account(
            &payer.pubkey(),
            &mint.pubkey(),
            rent,
            MINT_LEN as u64,
            &TOKEN_PROGRAM_ID,
        ),
        spl_token::initialize_mint2(&mint.pubkey(), decimals, authority, Some(authority)),
    ];
    let signature = submit(rpc, &instructions, payer, &[&mint]).await?;
    info!(mint = %mint.pubkey(), decimals, "mint created");

    Ok(MintReport {
        mint: mint.pubkey(),
        decimals,
        signature,
    })
}

/// Return `owner`'s associated token account for `mint`, creating it first
/// if it does not exist.
pub async fn get_or_create_associated_token_account<R>(
    rpc: &R,
    payer: &Keypair,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Result<Pubkey, RpcError>
where
    R: RpcConnection + ?Sized,
{
    let ata = derive_associated_token_address(owner, mint, &TOKEN_PROGRAM_ID)?;
    if rpc.get_account(&ata).await?.is_some() {
        debug!(%ata, "associated token account exists");
        return Ok(ata);
    }

    let create = spl_token::create_associated_token_account_idempotent(
        &payer.pubkey(),
        owner,
        mint,
        &TOKEN_PROGRAM_ID,
    )?;
    submit(rpc, &[create], payer, &[]).await?;
    info!(%ata, %owner, "associated token account created");
    Ok(ata)
}

/// Mint `amount` raw units of `mint` into `owner`'s associated token account.
pub async fn mint_to_owner<R>(
    rpc: &R,
    cfg: &ClientConfig,
    payer: &Keypair,
    authority: &Keypair,
    mint: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Result<MintToReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    ensure_funded(rpc, &payer.pubkey(), &cfg.funding).await?;
    let token_account = get_or_create_associated_token_account(rpc, payer, owner, mint).await?;

    let mint_to = spl_token::mint_to(mint, &token_account, &authority.pubkey(), amount)?;
    let signature = submit(rpc, &[mint_to], payer, &[authority]).await?;

    let balance = token_balance(rpc, &token_account).await?;
    info!(%token_account, amount, balance, "tokens minted");

    Ok(MintToReport {
        token_account,
        signature,
        balance,
    })
}

/// Create the program state and vault accounts.
pub async fn initialize<R>(
    rpc: &R,
    cfg: &ClientConfig,
    user: &Keypair,
) -> Result<InitializeReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    ensure_funded(rpc, &user.pubkey(), &cfg.funding).await?;

    let accounts = InitializeAccounts::derive(&cfg.program_id, &user.pubkey())?;
    info!(
        program_state = %accounts.program_state,
        vault = %accounts.vault,
        "initializing solbank"
    );
    let signature = submit(rpc, &[accounts.instruction(&cfg.program_id)], user, &[]).await?;

    Ok(InitializeReport {
        program_state: accounts.program_state,
        vault: accounts.vault,
        signature,
    })
}

/// Deposit `amount` raw units of `mint` from the user into the vault.
pub async fn deposit_token<R>(
    rpc: &R,
    cfg: &ClientConfig,
    user: &Keypair,
    mint: &Pubkey,
    amount: u64,
) -> Result<TokenTransferReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    ensure_funded(rpc, &user.pubkey(), &cfg.funding).await?;
    get_or_create_associated_token_account(rpc, user, &user.pubkey(), mint).await?;

    let accounts = DepositTokenAccounts::derive(&cfg.program_id, &user.pubkey(), mint)?;
    let instruction = accounts.instruction(&cfg.program_id, amount);

    token_transfer(
        rpc,
        user,
        instruction,
        accounts.vault,
        accounts.vault_token_account,
        accounts.user_token_account,
    )
    .await
}

/// Withdraw `amount` raw units of `mint` from the vault back to the user.
pub async fn withdraw_token<R>(
    rpc: &R,
    cfg: &ClientConfig,
    user: &Keypair,
    mint: &Pubkey,
    amount: u64,
) -> Result<TokenTransferReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    ensure_funded(rpc, &user.pubkey(), &cfg.funding).await?;
    get_or_create_associated_token_account(rpc, user, &user.pubkey(), mint).await?;

    let accounts = WithdrawTokenAccounts::derive(&cfg.program_id, &user.pubkey(), mint)?;

    let slot = rpc.get_slot().await?;
    match rpc.get_account(&accounts.program_state).await? {
        Some(account) => {
            let state = ProgramState::unpack(&account.data)?;
            info!(
                slot,
                initialized_at = state.slot,
                unlocks_at = state.earliest_withdrawal_slot(),
                "withdrawal window"
            );
        }
        None => info!(slot, "program state not found"),
    }

    let instruction = accounts.instruction(&cfg.program_id, amount);
    token_transfer(
        rpc,
        user,
        instruction,
        accounts.vault,
        accounts.vault_token_account,
        accounts.user_token_account,
    )
    .await
}

async fn token_transfer<R>(
    rpc: &R,
    user: &Keypair,
    instruction: SolInstruction,
    vault: Pubkey,
    vault_token_account: Pubkey,
    user_token_account: Pubkey,
) -> Result<TokenTransferReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    let vault_before = token_balance(rpc, &vault_token_account).await?;
    let user_before = token_balance(rpc, &user_token_account).await?;
    info!(%vault, %vault_token_account, vault_before, user_before, "balances before");

    let signature = submit(rpc, &[instruction], user, &[]).await?;

    let vault_balance = BalanceDelta {
        before: vault_before,
        after: token_balance(rpc, &vault_token_account).await?,
    };
    let user_balance = BalanceDelta {
        before: user_before,
        after: token_balance(rpc, &user_token_account).await?,
    };
    info!(vault = %vault_balance, user = %user_balance, "balances after");

    Ok(TokenTransferReport {
        signature,
        vault,
        vault_token_account,
        user_token_account,
        vault_balance,
        user_balance,
    })
}

/// Deposit `lamports` of SOL into the vault.
pub async fn deposit_sol<R>(
    rpc: &R,
    cfg: &ClientConfig,
    user: &Keypair,
    lamports: u64,
) -> Result<SolTransferReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    ensure_funded(rpc, &user.pubkey(), &cfg.funding).await?;
    let accounts = SolTransferAccounts::derive(&cfg.program_id, &user.pubkey())?;
    let instruction = accounts.deposit(&cfg.program_id, lamports);
    sol_transfer(rpc, user, instruction, accounts.vault).await
}

/// Withdraw `lamports` of SOL from the vault.
pub async fn withdraw_sol<R>(
    rpc: &R,
    cfg: &ClientConfig,
    user: &Keypair,
    lamports: u64,
) -> Result<SolTransferReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    ensure_funded(rpc, &user.pubkey(), &cfg.funding).await?;
    let accounts = SolTransferAccounts::derive(&cfg.program_id, &user.pubkey())?;
    let instruction = accounts.withdraw(&cfg.program_id, lamports);
    sol_transfer(rpc, user, instruction, accounts.vault).await
}

async fn sol_transfer<R>(
    rpc: &R,
    user: &Keypair,
    instruction: SolInstruction,
    vault: Pubkey,
) -> Result<SolTransferReport, RpcError>
where
    R: RpcConnection + ?Sized,
{
    let before = rpc.get_balance(&vault).await?;
    let signature = submit(rpc, &[instruction], user, &[]).await?;
    let vault_lamports = BalanceDelta {
        before,
        after: rpc.get_balance(&vault).await?,
    };
    info!(%vault, lamports = %vault_lamports, "vault balance");

    Ok(SolTransferReport {
        signature,
        vault,
        vault_lamports,
    })
}

/// Write a token account holding `amount` directly at `owner`'s ATA.
pub async fn seed_token_account<R>(
    cheats: &CheatCodes<'_, R>,
    owner: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    policy: &FundingPolicy,
) -> Result<SeedReport, RpcError>
where
    R: RpcConnection + RawRpc + ?Sized,
{
    let rpc = cheats.rpc();
    ensure_funded(rpc, owner, policy).await?;
    let token_account = derive_associated_token_address(owner, mint, &TOKEN_PROGRAM_ID)?;
    let lamports = rpc
        .get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN)
        .await?;

    let account = AccountOverride {
        lamports,
        data: TokenAccount::new(*mint, *owner, amount).pack().to_vec(),
        owner: TOKEN_PROGRAM_ID,
        executable: false,
    };
    cheats.set_account(&token_account, &account).await?;

    let balance = token_balance(rpc, &token_account).await?;
    Ok(SeedReport {
        token_account,
        balance,
    })
}

/// Set `owner`'s token balance for `mint` through the validator.
pub async fn seed_token_balance<R>(
    cheats: &CheatCodes<'_, R>,
    owner: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    policy: &FundingPolicy,
) -> Result<SeedReport, RpcError>
where
    R: RpcConnection + RawRpc + ?Sized,
{
    ensure_funded(cheats.rpc(), owner, policy).await?;
    cheats
        .set_token_account(
            owner,
            mint,
            &TokenAccountOverride { amount },
            &TOKEN_PROGRAM_ID,
        )
        .await?;

    let token_account = derive_associated_token_address(owner, mint, &TOKEN_PROGRAM_ID)?;
    let balance = token_balance(cheats.rpc(), &token_account).await?;
    Ok(SeedReport {
        token_account,
        balance,
    })
}
