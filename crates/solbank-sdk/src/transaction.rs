//! Legacy Solana transaction wire format and signing.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use std::fmt;
use std::str::FromStr;

use crate::address::Pubkey;
use crate::error::SdkError;
use crate::keypair::Keypair;

/// The System Program: 32 zero bytes (`11111111111111111111111111111111`).
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// System Program `CreateAccount` instruction index (little-endian u32).
const SYSTEM_CREATE_ACCOUNT_IX_INDEX: u32 = 0;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

fn encode_len(len: usize) -> Result<Vec<u8>, SdkError> {
    let len = u16::try_from(len)
        .map_err(|_| SdkError::SerializationError(format!("length {len} exceeds u16")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl SolAccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled, unsigned transaction message.
#[derive(Debug, Clone)]
pub struct SolTransaction {
    /// Account keys in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Pubkey>,

    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,

    pub recent_blockhash: [u8; 32],

    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// An instruction whose account references are indices into `account_keys`.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

impl SolTransaction {
    /// The accounts that must sign, in signature-slot order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..self.num_required_signatures as usize]
    }

    /// Whether the key at `index` is writable under the message header rules.
    pub fn is_writable(&self, index: usize) -> bool {
        let signers = self.num_required_signatures as usize;
        if index < signers {
            index < signers - self.num_readonly_signed as usize
        } else {
            index < self.account_keys.len() - self.num_readonly_unsigned as usize
        }
    }
}

/// A 64-byte Ed25519 transaction signature.
///
/// The first signature of a transaction doubles as its id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SdkError::SerializationError(format!("base58 decode failed: {e}")))?;
        let arr: [u8; 64] = bytes.try_into().map_err(|v: Vec<u8>| {
            SdkError::SerializationError(format!("expected 64 signature bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

/// A message together with one signature per required signer.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub message: SolTransaction,
    pub signatures: Vec<Signature>,
}

impl SignedTransaction {
    /// The transaction id (first signature).
    pub fn signature(&self) -> Signature {
        self.signatures.first().copied().unwrap_or_default()
    }

    /// Serialize into wire format, ready for `sendTransaction`.
    pub fn serialize(&self) -> Result<Vec<u8>, SdkError> {
        let message_bytes = serialize_message(&self.message)?;

        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message_bytes.len());
        wire.extend_from_slice(&encode_len(self.signatures.len())?);
        for signature in &self.signatures {
            wire.extend_from_slice(signature.as_bytes());
        }
        wire.extend_from_slice(&message_bytes);

        Ok(wire)
    }
}

// ---------------------------------------------------------------------------
// Transaction building
// ---------------------------------------------------------------------------

/// Compile instructions into a message with a single fee payer.
///
/// The fee payer is always the first signer and sits at index 0.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &Pubkey,
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SdkError> {
    if instructions.is_empty() {
        return Err(SdkError::TransactionBuildError(
            "transaction needs at least one instruction".into(),
        ));
    }

    // Instruction account lists are tiny, a Vec beats a map here.
    struct AccountEntry {
        pubkey: Pubkey,
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort: insertion order is kept inside each category, so the fee
    // payer stays first among writable signers.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries.len() > u8::MAX as usize + 1 {
        return Err(SdkError::TransactionBuildError(format!(
            "too many accounts: {}",
            entries.len()
        )));
    }

    let num_signers = entries.iter().filter(|e| e.is_signer).count() as u8;
    let num_readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let num_readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();

    let index_of = |key: &Pubkey| -> Result<u8, SdkError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SdkError::TransactionBuildError(format!("{key} not in account keys")))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let program_id_index = index_of(&ix.program_id)?;
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.pubkey))
            .collect::<Result<Vec<u8>, SdkError>>()?;

        compiled.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(SolTransaction {
        account_keys,
        num_required_signatures: num_signers,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
    })
}

/// Serialize the message (the bytes that get signed).
pub fn serialize_message(tx: &SolTransaction) -> Result<Vec<u8>, SdkError> {
    let mut buf = Vec::with_capacity(256);

    buf.push(tx.num_required_signatures);
    buf.push(tx.num_readonly_signed);
    buf.push(tx.num_readonly_unsigned);

    buf.extend_from_slice(&encode_len(tx.account_keys.len())?);
    for key in &tx.account_keys {
        buf.extend_from_slice(key.as_ref());
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&encode_len(tx.compiled_instructions.len())?);
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);

        buf.extend_from_slice(&encode_len(ix.account_indices.len())?);
        buf.extend_from_slice(&ix.account_indices);

        buf.extend_from_slice(&encode_len(ix.data.len())?);
        buf.extend_from_slice(&ix.data);
    }

    Ok(buf)
}

/// Sign a compiled message with every required signer.
///
/// Signatures are laid out in the order of the message's signer keys. Each
/// required signer must be present in `signers`, and every supplied keypair
/// must be one the message asks for.
pub fn sign_transaction(
    tx: SolTransaction,
    signers: &[&Keypair],
) -> Result<SignedTransaction, SdkError> {
    let message_bytes = serialize_message(&tx)?;

    for signer in signers {
        let pubkey = signer.pubkey();
        if !tx.signer_keys().contains(&pubkey) {
            return Err(SdkError::UnexpectedSigner(pubkey.to_string()));
        }
    }

    let signatures = tx
        .signer_keys()
        .iter()
        .map(|key| {
            signers
                .iter()
                .find(|s| s.pubkey() == *key)
                .map(|s| Signature::new(s.sign_message(&message_bytes)))
                .ok_or_else(|| SdkError::MissingSigner(key.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SignedTransaction {
        message: tx,
        signatures,
    })
}

// ---------------------------------------------------------------------------
// System Program
// ---------------------------------------------------------------------------

/// Build a System Program `CreateAccount` instruction.
///
/// Both `from` (funding) and `new_account` must sign.
pub fn create_account(
    from: &Pubkey,
    new_account: &Pubkey,
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> SolInstruction {
    // u32 LE index + u64 LE lamports + u64 LE space + 32-byte owner = 52 bytes.
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&SYSTEM_CREATE_ACCOUNT_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_ref());

    SolInstruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*from, true),
            SolAccountMeta::writable(*new_account, true),
        ],
        data,
    }
}
