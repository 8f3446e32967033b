//! Offline building blocks for talking to the solbank program.
//!
//! Address and PDA derivation, Ed25519 keypairs, the legacy transaction wire
//! format, SPL Token instructions and layouts, and the typed solbank program
//! interface. Everything here is pure: no network access and no async.
//!
//! We implement the Solana wire format by hand on top of `ed25519-dalek`,
//! `curve25519-dalek` and `bs58` rather than depending on `solana-sdk`.

pub mod address;
pub mod error;
pub mod keypair;
pub mod pda;
pub mod solbank;
pub mod spl_token;
pub mod transaction;

pub use address::{address_to_bytes, bytes_to_address, validate_address, Pubkey};
pub use error::SdkError;
pub use keypair::Keypair;
pub use pda::{
    create_program_address, derive_associated_token_address, find_program_address,
    program_state_address, vault_address, vault_token_address,
};
pub use solbank::{ProgramState, SolbankError, SOLBANK_PROGRAM_ID};
pub use spl_token::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
pub use transaction::{
    compile_transaction, sign_transaction, Signature, SignedTransaction, SolAccountMeta,
    SolInstruction, SolTransaction, SYSTEM_PROGRAM_ID,
};
