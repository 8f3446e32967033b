use thiserror::Error;

/// Errors raised while deriving addresses or building and signing transactions.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid seeds: {0}")]
    InvalidSeeds(String),

    #[error("no viable bump seed for program address")]
    NoViableBump,

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("missing signature for {0}")]
    MissingSigner(String),

    #[error("signer {0} is not required by the transaction")]
    UnexpectedSigner(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid account data: {0}")]
    InvalidAccountData(String),
}
