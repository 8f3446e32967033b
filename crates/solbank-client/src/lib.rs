//! Network side of the solbank tooling.
//!
//! A JSON-RPC connection, the balance, funding and submission helpers built on
//! it, local validator cheat codes, and the end-to-end flows the CLI runs.

pub mod balance;
pub mod cheatcodes;
pub mod config;
pub mod error;
pub mod flows;
pub mod funding;
pub mod rpc;
pub mod submit;

pub use balance::{fetch_token_account, owner_token_balance, token_balance, BalanceDelta};
pub use cheatcodes::{AccountOverride, CheatCodes, TokenAccountOverride};
pub use config::{Actors, ClientConfig};
pub use error::{ConfigError, RpcError};
pub use funding::{ensure_funded, FundingOutcome, FundingPolicy, LAMPORTS_PER_SOL};
pub use rpc::{
    Account, Commitment, RawRpc, RpcConnection, RpcUrl, SignatureStatus, SolanaRpcConnection,
};
pub use submit::submit;
