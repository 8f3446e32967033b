use clap::{Parser, Subcommand};
use solbank_client::RpcUrl;
use solbank_sdk::{Pubkey, SOLBANK_PROGRAM_ID};

#[derive(Parser, Debug)]
#[command(name = "solbank", author, version, about, long_about = None)]
pub struct Cli {
    /// RPC endpoint, or one of `localnet`, `devnet`, `testnet`.
    #[arg(long, global = true, env = "SOLBANK_RPC_URL", default_value = "localnet")]
    pub rpc_url: RpcUrl,

    /// Address of the deployed solbank program.
    #[arg(long, global = true, env = "SOLBANK_PROGRAM_ID", default_value_t = SOLBANK_PROGRAM_ID)]
    pub program_id: Pubkey,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a new Base58 secret and its public key.
    GenerateKeypair,

    /// Create a mint and mint an initial supply to the user.
    CreateMint {
        #[arg(long, default_value_t = 9)]
        decimals: u8,

        /// Raw units minted to `USER_PRIVATE_KEY`.
        #[arg(long, default_value_t = 1_000_000_000)]
        initial_amount: u64,
    },

    /// Create the program state and vault accounts.
    Initialize,

    /// Move tokens from the user's token account into the vault.
    DepositToken {
        mint: Pubkey,
        /// Raw token units.
        amount: u64,
    },

    /// Move tokens from the vault back to the user.
    WithdrawToken {
        mint: Pubkey,
        /// Raw token units.
        amount: u64,
    },

    /// Transfer lamports from the user into the vault.
    DepositSol {
        lamports: u64,
    },

    /// Transfer lamports from the vault back to the user.
    WithdrawSol {
        lamports: u64,
    },

    /// Write a token account for `USDT_MINT` at the user's ATA (local validator only).
    SetupTokenAccount {
        amount: u64,
    },

    /// Set the user's `USDT_MINT` balance (local validator only).
    SetupTokenBalance {
        amount: u64,
    },

    /// Token balance of an owner's associated token account.
    Balance {
        mint: Pubkey,

        /// Defaults to the `USER_PRIVATE_KEY` public key.
        #[arg(long)]
        owner: Option<Pubkey>,
    },
}
