mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use solbank_client::{
    flows, owner_token_balance, Actors, CheatCodes, ClientConfig, SolanaRpcConnection,
};
use solbank_sdk::{derive_associated_token_address, Keypair, TOKEN_PROGRAM_ID};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    setup_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = ClientConfig::new(cli.rpc_url).with_program_id(cli.program_id);
    let rpc = SolanaRpcConnection::new(&cfg);
    let actors = Actors::from_env();
    info!(rpc_url = %cfg.rpc_url, program_id = %cfg.program_id, "solbank");

    match cli.command {
        Commands::GenerateKeypair => {
            let keypair = Keypair::generate();
            println!("public key: {}", keypair.pubkey());
            println!("secret:     {}", keypair.to_base58_secret().as_str());
        }
        Commands::CreateMint {
            decimals,
            initial_amount,
        } => {
            let payer = actors.mint_payer()?;
            let authority = actors.token_authority()?;
            let user = actors.user()?;

            let mint = flows::create_mint(&rpc, &cfg, &payer, &authority.pubkey(), decimals)
                .await
                .context("creating mint")?;
            println!("mint: {}", mint.mint);

            let minted = flows::mint_to_owner(
                &rpc,
                &cfg,
                &payer,
                &authority,
                &mint.mint,
                &user.pubkey(),
                initial_amount,
            )
            .await
            .context("minting initial supply")?;
            println!("user token account: {}", minted.token_account);
            println!("user balance: {}", minted.balance);
        }
        Commands::Initialize => {
            let user = actors.user()?;
            let report = flows::initialize(&rpc, &cfg, &user).await?;
            println!("program state: {}", report.program_state);
            println!("vault: {}", report.vault);
            println!("signature: {}", report.signature);
        }
        Commands::DepositToken { mint, amount } => {
            let user = actors.user()?;
            let report = flows::deposit_token(&rpc, &cfg, &user, &mint, amount).await?;
            println!("vault token account: {}", report.vault_token_account);
            println!("vault balance: {}", report.vault_balance);
            println!("signature: {}", report.signature);
        }
        Commands::WithdrawToken { mint, amount } => {
            let user = actors.user()?;
            let report = flows::withdraw_token(&rpc, &cfg, &user, &mint, amount).await?;
            println!("vault balance: {}", report.vault_balance);
            println!("user balance: {}", report.user_balance);
            println!("signature: {}", report.signature);
        }
        Commands::DepositSol { lamports } => {
            let user = actors.user()?;
            let report = flows::deposit_sol(&rpc, &cfg, &user, lamports).await?;
            println!("vault lamports: {}", report.vault_lamports);
            println!("signature: {}", report.signature);
        }
        Commands::WithdrawSol { lamports } => {
            let user = actors.user()?;
            let report = flows::withdraw_sol(&rpc, &cfg, &user, lamports).await?;
            println!("vault lamports: {}", report.vault_lamports);
            println!("signature: {}", report.signature);
        }
        Commands::SetupTokenAccount { amount } => {
            let user = actors.user()?;
            let mint = actors.usdt_mint()?;
            let cheats = CheatCodes::new(&rpc)?;
            let report =
                flows::seed_token_account(&cheats, &user.pubkey(), &mint, amount, &cfg.funding)
                    .await?;
            println!("token account: {}", report.token_account);
            println!("balance: {}", report.balance);
        }
        Commands::SetupTokenBalance { amount } => {
            let user = actors.user()?;
            let mint = actors.usdt_mint()?;
            let cheats = CheatCodes::new(&rpc)?;
            let report =
                flows::seed_token_balance(&cheats, &user.pubkey(), &mint, amount, &cfg.funding)
                    .await?;
            println!("token account: {}", report.token_account);
            println!("balance: {}", report.balance);
        }
        Commands::Balance { mint, owner } => {
            let owner = match owner {
                Some(owner) => owner,
                None => actors.user()?.pubkey(),
            };
            let ata = derive_associated_token_address(&owner, &mint, &TOKEN_PROGRAM_ID)?;
            let balance = owner_token_balance(&rpc, &owner, &mint).await?;
            println!("token account: {ata}");
            println!("balance: {balance}");
        }
    }

    Ok(())
}
