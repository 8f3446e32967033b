//! Ed25519 signing identities.
//!
//! Secrets travel as the Base58 encoding of 64 bytes: the 32-byte seed
//! followed by the 32-byte public key. That is the format the actor
//! environment variables carry.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use zeroize::{Zeroize, Zeroizing};

use crate::address::Pubkey;
use crate::error::SdkError;

/// Length of the serialized secret (`seed || pubkey`).
pub const KEYPAIR_LEN: usize = 64;

/// An actor that can sign transactions.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self { signing_key }
    }

    /// Build a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Build a keypair from the 64-byte `seed || pubkey` form.
    ///
    /// The embedded public key must match the one derived from the seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SdkError> {
        if bytes.len() != KEYPAIR_LEN {
            return Err(SdkError::InvalidPrivateKey(format!(
                "expected {KEYPAIR_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        seed.zeroize();

        if keypair.pubkey().as_ref() != &bytes[32..] {
            return Err(SdkError::InvalidPrivateKey(
                "public key does not match secret".into(),
            ));
        }

        Ok(keypair)
    }

    /// Decode a Base58 secret.
    pub fn from_base58_secret(secret: &str) -> Result<Self, SdkError> {
        let bytes = Zeroizing::new(
            bs58::decode(secret.trim())
                .into_vec()
                .map_err(|e| SdkError::InvalidPrivateKey(format!("base58 decode failed: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Export the secret as Base58; the returned string is wiped on drop.
    pub fn to_base58_secret(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.signing_key.to_keypair_bytes());
        Zeroizing::new(bs58::encode(&bytes[..]).into_string())
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign an arbitrary message, returning the raw 64-byte signature.
    pub fn sign_message(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

// Never print the secret half.
impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.pubkey())
    }
}
