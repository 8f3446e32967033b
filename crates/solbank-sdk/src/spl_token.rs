//! SPL Token and Associated Token Account instructions and layouts.
//!
//! Built by hand against the program wire formats, without the `spl-token`
//! or `solana-sdk` crates.

use crate::address::Pubkey;
use crate::error::SdkError;
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
]);

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d, 0x83,
    0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9, 0xf8, 0x59,
]);

/// Rent sysvar: `SysvarRent111111111111111111111111111111111`
pub const SYSVAR_RENT_ID: Pubkey = Pubkey::new_from_array([
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x5c, 0x51, 0x21, 0x8c, 0xc9, 0x4c, 0x3d, 0x4a, 0xf1, 0x7f,
    0x58, 0xda, 0xee, 0x08, 0x9b, 0xa1, 0xfd, 0x44, 0xe3, 0xdb, 0xd9, 0x8a, 0x00, 0x00, 0x00, 0x00,
]);

/// Size of a packed `Mint`.
pub const MINT_LEN: usize = 82;

/// Size of a packed token `Account`.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

const IX_TRANSFER: u8 = 3;
const IX_MINT_TO: u8 = 7;
const IX_INITIALIZE_MINT2: u8 = 20;
const ATA_IX_CREATE_IDEMPOTENT: u8 = 1;

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Build `InitializeMint2` for an already allocated mint account.
///
/// Data: `[20, decimals, mint_authority(32), freeze_option(1), freeze_authority(32)?]`.
pub fn initialize_mint2(
    mint: &Pubkey,
    decimals: u8,
    mint_authority: &Pubkey,
    freeze_authority: Option<&Pubkey>,
) -> SolInstruction {
    let mut data = Vec::with_capacity(67);
    data.push(IX_INITIALIZE_MINT2);
    data.push(decimals);
    data.extend_from_slice(mint_authority.as_ref());
    match freeze_authority {
        Some(authority) => {
            data.push(1);
            data.extend_from_slice(authority.as_ref());
        }
        None => data.push(0),
    }

    SolInstruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![SolAccountMeta::writable(*mint, false)],
        data,
    }
}

/// Build `MintTo`: mint `amount` raw units of `mint` into `destination`.
pub fn mint_to(
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<SolInstruction, SdkError> {
    if amount == 0 {
        return Err(SdkError::TransactionBuildError(
            "mint amount must be > 0".into(),
        ));
    }

    Ok(SolInstruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*mint, false),
            SolAccountMeta::writable(*destination, false),
            SolAccountMeta::readonly(*authority, true),
        ],
        data: amount_data(IX_MINT_TO, amount),
    })
}

/// Build an SPL Token `Transfer`.
pub fn transfer(
    source: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Result<SolInstruction, SdkError> {
    if amount == 0 {
        return Err(SdkError::TransactionBuildError(
            "SPL transfer amount must be > 0".into(),
        ));
    }

    Ok(SolInstruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*source, false),
            SolAccountMeta::writable(*destination, false),
            SolAccountMeta::readonly(*owner, true),
        ],
        data: amount_data(IX_TRANSFER, amount),
    })
}

/// Build `CreateIdempotent` on the Associated Token Account program.
///
/// Succeeds without changes if the ATA already exists.
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Result<SolInstruction, SdkError> {
    let ata = crate::pda::derive_associated_token_address(owner, mint, token_program)?;

    Ok(SolInstruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*payer, true),
            SolAccountMeta::writable(ata, false),
            SolAccountMeta::readonly(*owner, false),
            SolAccountMeta::readonly(*mint, false),
            SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            SolAccountMeta::readonly(*token_program, false),
        ],
        data: vec![ATA_IX_CREATE_IDEMPOTENT],
    })
}

fn amount_data(tag: u8, amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(9);
    data.push(tag);
    data.extend_from_slice(&amount.to_le_bytes());
    data
}

// ---------------------------------------------------------------------------
// Account layouts
// ---------------------------------------------------------------------------

/// Token account state byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountState {
    #[default]
    Uninitialized,
    Initialized,
    Frozen,
}

/// A token account as stored by the SPL Token program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    /// Raw units.
    pub amount: u64,
    pub delegate: Option<Pubkey>,
    pub state: AccountState,
    pub is_native: Option<u64>,
    pub delegated_amount: u64,
    pub close_authority: Option<Pubkey>,
}

impl TokenAccount {
    /// A plain initialized account with no delegate or close authority.
    pub fn new(mint: Pubkey, owner: Pubkey, amount: u64) -> Self {
        Self {
            mint,
            owner,
            amount,
            state: AccountState::Initialized,
            ..Default::default()
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, SdkError> {
        if data.len() != TOKEN_ACCOUNT_LEN {
            return Err(SdkError::InvalidAccountData(format!(
                "expected {TOKEN_ACCOUNT_LEN} bytes, got {}",
                data.len()
            )));
        }

        let mut r = Reader::new(data);
        let mint = r.pubkey();
        let owner = r.pubkey();
        let amount = r.u64();
        let delegate = r.coption_pubkey()?;
        let state = match r.u8() {
            0 => AccountState::Uninitialized,
            1 => AccountState::Initialized,
            2 => AccountState::Frozen,
            other => {
                return Err(SdkError::InvalidAccountData(format!(
                    "unknown account state {other}"
                )))
            }
        };
        let is_native = r.coption_u64()?;
        let delegated_amount = r.u64();
        let close_authority = r.coption_pubkey()?;

        Ok(Self {
            mint,
            owner,
            amount,
            delegate,
            state,
            is_native,
            delegated_amount,
            close_authority,
        })
    }

    pub fn pack(&self) -> [u8; TOKEN_ACCOUNT_LEN] {
        let mut out = Vec::with_capacity(TOKEN_ACCOUNT_LEN);
        out.extend_from_slice(self.mint.as_ref());
        out.extend_from_slice(self.owner.as_ref());
        out.extend_from_slice(&self.amount.to_le_bytes());
        put_coption_pubkey(&mut out, self.delegate.as_ref());
        out.push(match self.state {
            AccountState::Uninitialized => 0,
            AccountState::Initialized => 1,
            AccountState::Frozen => 2,
        });
        match self.is_native {
            Some(reserve) => {
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&reserve.to_le_bytes());
            }
            None => out.extend_from_slice(&[0u8; 12]),
        }
        out.extend_from_slice(&self.delegated_amount.to_le_bytes());
        put_coption_pubkey(&mut out, self.close_authority.as_ref());

        let mut packed = [0u8; TOKEN_ACCOUNT_LEN];
        packed.copy_from_slice(&out);
        packed
    }
}

/// A mint as stored by the SPL Token program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mint {
    pub mint_authority: Option<Pubkey>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<Pubkey>,
}

impl Mint {
    pub fn unpack(data: &[u8]) -> Result<Self, SdkError> {
        if data.len() != MINT_LEN {
            return Err(SdkError::InvalidAccountData(format!(
                "expected {MINT_LEN} bytes, got {}",
                data.len()
            )));
        }

        let mut r = Reader::new(data);
        let mint_authority = r.coption_pubkey()?;
        let supply = r.u64();
        let decimals = r.u8();
        let is_initialized = r.u8() != 0;
        let freeze_authority = r.coption_pubkey()?;

        Ok(Self {
            mint_authority,
            supply,
            decimals,
            is_initialized,
            freeze_authority,
        })
    }

    pub fn pack(&self) -> [u8; MINT_LEN] {
        let mut out = Vec::with_capacity(MINT_LEN);
        put_coption_pubkey(&mut out, self.mint_authority.as_ref());
        out.extend_from_slice(&self.supply.to_le_bytes());
        out.push(self.decimals);
        out.push(self.is_initialized as u8);
        put_coption_pubkey(&mut out, self.freeze_authority.as_ref());

        let mut packed = [0u8; MINT_LEN];
        packed.copy_from_slice(&out);
        packed
    }
}

fn put_coption_pubkey(out: &mut Vec<u8>, value: Option<&Pubkey>) {
    match value {
        Some(key) => {
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(key.as_ref());
        }
        None => out.extend_from_slice(&[0u8; 36]),
    }
}

/// Cursor over a buffer whose length was already checked.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn pubkey(&mut self) -> Pubkey {
        Pubkey::new_from_array(self.take())
    }

    fn tag(&mut self) -> Result<bool, SdkError> {
        match u32::from_le_bytes(self.take()) {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SdkError::InvalidAccountData(format!(
                "invalid COption tag {other}"
            ))),
        }
    }

    fn coption_pubkey(&mut self) -> Result<Option<Pubkey>, SdkError> {
        let present = self.tag()?;
        let key = self.pubkey();
        Ok(present.then_some(key))
    }

    fn coption_u64(&mut self) -> Result<Option<u64>, SdkError> {
        let present = self.tag()?;
        let value = self.u64();
        Ok(present.then_some(value))
    }
}
