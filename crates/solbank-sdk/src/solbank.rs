//! Typed client interface of the on-chain solbank program.
//!
//! Every instruction has its own accounts struct listing exactly the roles the
//! program validates, in the program's order. Derivable addresses are derived
//! here, never typed in by callers.

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::SdkError;
use crate::pda;
use crate::spl_token::{ASSOCIATED_TOKEN_PROGRAM_ID, SYSVAR_RENT_ID, TOKEN_PROGRAM_ID};
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

/// Default deployment: `2bgE3SRwj5Kq7gfPbeS2V6DxXPacwp9igRrKKf5EbZ8s`
pub const SOLBANK_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x17, 0xbd, 0xc9, 0x3f, 0xba, 0x66, 0x01, 0x0a, 0x5f, 0x31, 0x6b, 0x9c, 0x77, 0x4d, 0xb3, 0x7a,
    0x41, 0xff, 0x33, 0xf1, 0x86, 0x22, 0x67, 0x98, 0xc2, 0xc2, 0xf7, 0xc9, 0x8a, 0x87, 0x9e, 0x68,
]);

pub const VAULT_SEED: &[u8] = b"vault";
pub const PROGRAM_STATE_SEED: &[u8] = b"program_state";

/// Withdrawals unlock this many slots after `initialize`.
pub const SLOTS_PER_DAY: u64 = 216_000;

/// Anchor method discriminators: `sha256("global:<name>")[..8]`.
pub const INITIALIZE_DISCRIMINATOR: [u8; 8] = [175, 175, 109, 31, 13, 152, 155, 237];
pub const DEPOSIT_SOL_DISCRIMINATOR: [u8; 8] = [108, 81, 78, 117, 125, 155, 56, 200];
pub const WITHDRAW_SOL_DISCRIMINATOR: [u8; 8] = [145, 131, 74, 136, 65, 137, 42, 38];
pub const DEPOSIT_TOKEN_DISCRIMINATOR: [u8; 8] = [11, 156, 96, 218, 39, 163, 180, 19];
pub const WITHDRAW_TOKEN_DISCRIMINATOR: [u8; 8] = [136, 235, 181, 5, 101, 109, 57, 81];

/// `sha256("account:ProgramState")[..8]`
pub const PROGRAM_STATE_DISCRIMINATOR: [u8; 8] = [77, 209, 137, 229, 149, 67, 167, 230];

/// Compute an 8-byte Anchor discriminator for `namespace:name`.
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let hash: [u8; 32] = Sha256::digest(format!("{namespace}:{name}").as_bytes()).into();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

fn amount_data(discriminator: [u8; 8], amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&discriminator);
    data.extend_from_slice(&amount.to_le_bytes());
    data
}

// ---------------------------------------------------------------------------
// initialize
// ---------------------------------------------------------------------------

/// Accounts for `initialize`: creates the program state and vault PDAs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeAccounts {
    pub program_state: Pubkey,
    pub vault: Pubkey,
    pub user: Pubkey,
}

impl InitializeAccounts {
    pub fn derive(program_id: &Pubkey, user: &Pubkey) -> Result<Self, SdkError> {
        Ok(Self {
            program_state: pda::program_state_address(program_id)?.0,
            vault: pda::vault_address(program_id)?.0,
            user: *user,
        })
    }

    pub fn instruction(&self, program_id: &Pubkey) -> SolInstruction {
        SolInstruction {
            program_id: *program_id,
            accounts: vec![
                SolAccountMeta::writable(self.program_state, false),
                SolAccountMeta::writable(self.vault, false),
                SolAccountMeta::writable(self.user, true),
                SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            ],
            data: INITIALIZE_DISCRIMINATOR.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// deposit_sol / withdraw_sol
// ---------------------------------------------------------------------------

/// Accounts for `deposit_sol` and `withdraw_sol`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransferAccounts {
    pub vault: Pubkey,
    pub user: Pubkey,
}

impl SolTransferAccounts {
    pub fn derive(program_id: &Pubkey, user: &Pubkey) -> Result<Self, SdkError> {
        Ok(Self {
            vault: pda::vault_address(program_id)?.0,
            user: *user,
        })
    }

    pub fn deposit(&self, program_id: &Pubkey, lamports: u64) -> SolInstruction {
        self.instruction(program_id, DEPOSIT_SOL_DISCRIMINATOR, lamports)
    }

    pub fn withdraw(&self, program_id: &Pubkey, lamports: u64) -> SolInstruction {
        self.instruction(program_id, WITHDRAW_SOL_DISCRIMINATOR, lamports)
    }

    fn instruction(&self, program_id: &Pubkey, tag: [u8; 8], lamports: u64) -> SolInstruction {
        SolInstruction {
            program_id: *program_id,
            accounts: vec![
                SolAccountMeta::writable(self.vault, false),
                SolAccountMeta::writable(self.user, true),
                SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            ],
            data: amount_data(tag, lamports),
        }
    }
}

// ---------------------------------------------------------------------------
// deposit_token
// ---------------------------------------------------------------------------

/// Accounts for `deposit_token`. The vault token account is created by the
/// program on first deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositTokenAccounts {
    pub vault_token_account: Pubkey,
    pub user_token_account: Pubkey,
    pub vault: Pubkey,
    pub mint: Pubkey,
    pub user: Pubkey,
}

impl DepositTokenAccounts {
    pub fn derive(program_id: &Pubkey, user: &Pubkey, mint: &Pubkey) -> Result<Self, SdkError> {
        let (vault, _) = pda::vault_address(program_id)?;
        Ok(Self {
            vault_token_account: pda::derive_associated_token_address(
                &vault,
                mint,
                &TOKEN_PROGRAM_ID,
            )?,
            user_token_account: pda::derive_associated_token_address(
                user,
                mint,
                &TOKEN_PROGRAM_ID,
            )?,
            vault,
            mint: *mint,
            user: *user,
        })
    }

    pub fn instruction(&self, program_id: &Pubkey, amount: u64) -> SolInstruction {
        SolInstruction {
            program_id: *program_id,
            accounts: vec![
                SolAccountMeta::writable(self.vault_token_account, false),
                SolAccountMeta::writable(self.user_token_account, false),
                SolAccountMeta::readonly(self.vault, false),
                SolAccountMeta::readonly(self.mint, false),
                SolAccountMeta::writable(self.user, true),
                SolAccountMeta::readonly(TOKEN_PROGRAM_ID, false),
                SolAccountMeta::readonly(ASSOCIATED_TOKEN_PROGRAM_ID, false),
                SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
                SolAccountMeta::readonly(SYSVAR_RENT_ID, false),
            ],
            data: amount_data(DEPOSIT_TOKEN_DISCRIMINATOR, amount),
        }
    }
}

// ---------------------------------------------------------------------------
// withdraw_token
// ---------------------------------------------------------------------------

/// Accounts for `withdraw_token`. The vault PDA signs the inner transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawTokenAccounts {
    pub program_state: Pubkey,
    pub vault_token_account: Pubkey,
    pub user_token_account: Pubkey,
    pub vault: Pubkey,
    pub mint: Pubkey,
    pub user: Pubkey,
}

impl WithdrawTokenAccounts {
    pub fn derive(program_id: &Pubkey, user: &Pubkey, mint: &Pubkey) -> Result<Self, SdkError> {
        let deposit = DepositTokenAccounts::derive(program_id, user, mint)?;
        Ok(Self {
            program_state: pda::program_state_address(program_id)?.0,
            vault_token_account: deposit.vault_token_account,
            user_token_account: deposit.user_token_account,
            vault: deposit.vault,
            mint: deposit.mint,
            user: deposit.user,
        })
    }

    pub fn instruction(&self, program_id: &Pubkey, amount: u64) -> SolInstruction {
        SolInstruction {
            program_id: *program_id,
            accounts: vec![
                SolAccountMeta::readonly(self.program_state, false),
                SolAccountMeta::writable(self.vault_token_account, false),
                SolAccountMeta::writable(self.user_token_account, false),
                SolAccountMeta::readonly(self.vault, false),
                SolAccountMeta::readonly(self.mint, false),
                SolAccountMeta::writable(self.user, true),
                SolAccountMeta::readonly(TOKEN_PROGRAM_ID, false),
                SolAccountMeta::readonly(ASSOCIATED_TOKEN_PROGRAM_ID, false),
                SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            ],
            data: amount_data(WITHDRAW_TOKEN_DISCRIMINATOR, amount),
        }
    }
}

// ---------------------------------------------------------------------------
// Program state and errors
// ---------------------------------------------------------------------------

/// On-chain `ProgramState`: the slot at which `initialize` ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramState {
    pub slot: u64,
}

impl ProgramState {
    pub const LEN: usize = 8 + 8;

    pub fn unpack(data: &[u8]) -> Result<Self, SdkError> {
        if data.len() < Self::LEN {
            return Err(SdkError::InvalidAccountData(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                data.len()
            )));
        }
        if data[..8] != PROGRAM_STATE_DISCRIMINATOR {
            return Err(SdkError::InvalidAccountData(
                "account discriminator is not ProgramState".into(),
            ));
        }
        let mut slot = [0u8; 8];
        slot.copy_from_slice(&data[8..16]);
        Ok(Self {
            slot: u64::from_le_bytes(slot),
        })
    }

    pub fn pack(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..8].copy_from_slice(&PROGRAM_STATE_DISCRIMINATOR);
        out[8..].copy_from_slice(&self.slot.to_le_bytes());
        out
    }

    /// First slot at which `withdraw_token` is accepted.
    pub fn earliest_withdrawal_slot(&self) -> u64 {
        self.slot.saturating_add(SLOTS_PER_DAY)
    }
}

/// Custom errors raised by the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolbankError {
    InsufficientFunds,
    WithdrawalTooSoon,
}

impl SolbankError {
    /// Anchor numbers user errors from 6000.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            6000 => Some(Self::InsufficientFunds),
            6001 => Some(Self::WithdrawalTooSoon),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::InsufficientFunds => 6000,
            Self::WithdrawalTooSoon => 6001,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::InsufficientFunds => "Insufficient funds in vault",
            Self::WithdrawalTooSoon => "Cannot withdraw within 24 hours of initialization",
        }
    }
}
