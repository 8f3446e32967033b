//! Program-derived addresses (PDAs).
//!
//! A PDA is `SHA-256(seeds.. || program_id || "ProgramDerivedAddress")`,
//! accepted only when the digest is NOT a valid Ed25519 point, so no private
//! key can exist for it. `find_program_address` appends a one-byte bump seed
//! and walks it down from 255 until an off-curve digest appears.

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::SdkError;
use crate::solbank::{PROGRAM_STATE_SEED, VAULT_SEED};
use crate::spl_token::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};

/// Maximum number of seeds, including the bump.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Create a program address from a complete seed list (bump included).
///
/// Fails if the seeds are out of bounds or if the digest lies on the curve.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, SdkError> {
    check_seeds(seeds, MAX_SEEDS)?;
    hash_program_address(seeds, program_id).ok_or_else(|| {
        SdkError::InvalidSeeds("derived address lies on the ed25519 curve".into())
    })
}

/// Find the canonical program address and its bump for `seeds`.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), SdkError> {
    // One slot is reserved for the bump.
    check_seeds(seeds, MAX_SEEDS - 1)?;

    for bump in (0u8..=255).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);
        if let Some(address) = hash_program_address(&with_bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(SdkError::NoViableBump)
}

fn check_seeds(seeds: &[&[u8]], max_seeds: usize) -> Result<(), SdkError> {
    if seeds.len() > max_seeds {
        return Err(SdkError::InvalidSeeds(format!(
            "at most {max_seeds} seeds allowed, got {}",
            seeds.len()
        )));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(SdkError::InvalidSeeds(format!(
            "seed length {} exceeds {MAX_SEED_LEN}",
            seed.len()
        )));
    }
    Ok(())
}

/// `None` when the digest falls on the curve.
fn hash_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Option<Pubkey> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }
    Some(Pubkey::new_from_array(hash))
}

/// Derive the associated token account for an owner + mint pair.
///
/// Seeds: `[owner, token_program, mint]` under the Associated Token Account
/// program.
pub fn derive_associated_token_address(
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Result<Pubkey, SdkError> {
    find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// The solbank vault PDA and its bump.
pub fn vault_address(program_id: &Pubkey) -> Result<(Pubkey, u8), SdkError> {
    find_program_address(&[VAULT_SEED], program_id)
}

/// The solbank program-state PDA and its bump.
pub fn program_state_address(program_id: &Pubkey) -> Result<(Pubkey, u8), SdkError> {
    find_program_address(&[PROGRAM_STATE_SEED], program_id)
}

/// The vault's associated token account for `mint` (classic token program).
pub fn vault_token_address(program_id: &Pubkey, mint: &Pubkey) -> Result<Pubkey, SdkError> {
    let (vault, _) = vault_address(program_id)?;
    derive_associated_token_address(&vault, mint, &TOKEN_PROGRAM_ID)
}

/// Check whether 32 bytes decompress to an Ed25519 point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}
