//! Build, sign, send and confirm a transaction.

use solbank_sdk::{compile_transaction, sign_transaction, Keypair, Signature, SolInstruction};
use tracing::{debug, info};

use crate::error::RpcError;
use crate::rpc::RpcConnection;

/// Submit `instructions` paid for by `payer` and wait for confirmation.
///
/// `signers` lists every other keypair the instructions require. Any
/// rejection, preflight or on-chain, is returned as
/// [`RpcError::TransactionRejected`].
pub async fn submit<R>(
    rpc: &R,
    instructions: &[SolInstruction],
    payer: &Keypair,
    signers: &[&Keypair],
) -> Result<Signature, RpcError>
where
    R: RpcConnection + ?Sized,
{
    let blockhash = rpc.get_latest_blockhash().await?;
    let message = compile_transaction(instructions, &payer.pubkey(), &blockhash)?;

    let mut all_signers: Vec<&Keypair> = Vec::with_capacity(signers.len() + 1);
    all_signers.push(payer);
    for signer in signers {
        if signer.pubkey() != payer.pubkey() {
            all_signers.push(signer);
        }
    }
    let transaction = sign_transaction(message, &all_signers)?;

    let signature = rpc.send_transaction(&transaction).await?;
    debug!(%signature, "transaction sent");
    rpc.confirm_transaction(&signature).await?;
    info!(%signature, commitment = %rpc.commitment(), "transaction confirmed");

    Ok(signature)
}
