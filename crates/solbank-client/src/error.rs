use std::time::Duration;

use serde_json::Value;
use solbank_sdk::{SdkError, SolbankError};
use thiserror::Error;

/// Errors raised while talking to the network.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected rpc response: {0}")]
    UnexpectedResponse(String),

    /// The network refused a transaction, at preflight or on-chain.
    #[error("transaction rejected: {message}")]
    TransactionRejected {
        message: String,
        logs: Vec<String>,
        custom_code: Option<u32>,
    },

    #[error("transaction {signature} not confirmed within {timeout:?}")]
    ConfirmationTimeout {
        signature: String,
        timeout: Duration,
    },

    #[error("cheat codes are only available on a local validator, not {0}")]
    CheatCodesUnavailable(String),

    #[error(transparent)]
    Sdk(#[from] SdkError),
}

impl RpcError {
    /// Build a rejection from a transaction error object such as
    /// `{"InstructionError":[0,{"Custom":6000}]}`.
    pub fn rejected(message: impl Into<String>, err: &Value, logs: Vec<String>) -> Self {
        RpcError::TransactionRejected {
            message: message.into(),
            logs,
            custom_code: custom_error_code(err),
        }
    }

    /// The solbank program error behind a rejection, if any.
    pub fn program_error(&self) -> Option<SolbankError> {
        match self {
            RpcError::TransactionRejected {
                custom_code: Some(code),
                ..
            } => SolbankError::from_code(*code),
            _ => None,
        }
    }
}

/// Extract `Custom(n)` from an `InstructionError` transaction error.
pub(crate) fn custom_error_code(err: &Value) -> Option<u32> {
    err.get("InstructionError")?
        .get(1)?
        .get("Custom")?
        .as_u64()
        .and_then(|code| u32::try_from(code).ok())
}

/// Errors raised while loading actors and settings from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: String, reason: String },
}
