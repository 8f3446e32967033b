//! In-memory ledger standing in for a local validator.
//!
//! Executes the subset of the System, SPL Token, Associated Token Account and
//! solbank programs the flows use, with atomic transactions and the same
//! error shapes a real node reports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use solbank_client::{Account, Commitment, RawRpc, RpcConnection, RpcError, SignatureStatus};
use solbank_sdk::solbank::{
    ProgramState, DEPOSIT_SOL_DISCRIMINATOR, DEPOSIT_TOKEN_DISCRIMINATOR,
    INITIALIZE_DISCRIMINATOR, WITHDRAW_SOL_DISCRIMINATOR, WITHDRAW_TOKEN_DISCRIMINATOR,
};
use solbank_sdk::spl_token::{Mint, TokenAccount, ASSOCIATED_TOKEN_PROGRAM_ID, MINT_LEN, TOKEN_ACCOUNT_LEN};
use solbank_sdk::{
    derive_associated_token_address, program_state_address, vault_address, Keypair, Pubkey,
    Signature, SignedTransaction, SOLBANK_PROGRAM_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};

pub const LOCAL_URL: &str = "http://127.0.0.1:8899";
pub const FEE_PER_SIGNATURE: u64 = 5_000;

pub fn rent_exempt_minimum(len: usize) -> u64 {
    (128 + len as u64) * 6_960
}

pub fn keypair(byte: u8) -> Keypair {
    Keypair::from_seed(&[byte; 32])
}

#[derive(Default)]
struct Ledger {
    accounts: HashMap<Pubkey, Account>,
    statuses: HashMap<Signature, SignatureStatus>,
    slot: u64,
    airdrops: usize,
    faucet_down: bool,
    cheat_calls: Vec<String>,
    next_signature: u64,
}

impl Ledger {
    fn record(&mut self) -> Signature {
        self.next_signature += 1;
        let mut bytes = [0xA5u8; 64];
        bytes[..8].copy_from_slice(&self.next_signature.to_le_bytes());
        let signature = Signature::new(bytes);
        self.statuses.insert(
            signature,
            SignatureStatus {
                slot: self.slot,
                confirmation_status: Some(Commitment::Confirmed),
                err: None,
            },
        );
        self.slot += 1;
        signature
    }
}

pub struct MockRpc {
    url: String,
    program_id: Pubkey,
    ledger: Mutex<Ledger>,
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new(LOCAL_URL)
    }
}

impl MockRpc {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            program_id: SOLBANK_PROGRAM_ID,
            ledger: Mutex::new(Ledger {
                slot: 1,
                ..Ledger::default()
            }),
        }
    }

    pub fn fund(&self, address: &Pubkey, lamports: u64) {
        let mut ledger = self.ledger.lock().unwrap();
        credit(&mut ledger.accounts, address, lamports);
    }

    pub fn lamports(&self, address: &Pubkey) -> u64 {
        self.account(address).map(|a| a.lamports).unwrap_or(0)
    }

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        self.ledger.lock().unwrap().accounts.get(address).cloned()
    }

    pub fn put_account(&self, address: &Pubkey, account: Account) {
        self.ledger
            .lock()
            .unwrap()
            .accounts
            .insert(*address, account);
    }

    pub fn airdrop_count(&self) -> usize {
        self.ledger.lock().unwrap().airdrops
    }

    pub fn set_faucet_down(&self, down: bool) {
        self.ledger.lock().unwrap().faucet_down = down;
    }

    pub fn warp_slot(&self, by: u64) {
        self.ledger.lock().unwrap().slot += by;
    }

    pub fn cheat_calls(&self) -> Vec<String> {
        self.ledger.lock().unwrap().cheat_calls.clone()
    }

    fn execute(&self, ledger: &mut Ledger, tx: &SignedTransaction) -> Result<(), RpcError> {
        let message = &tx.message;
        let signer_keys = message.signer_keys();
        if tx.signatures.len() != signer_keys.len()
            || tx.signatures.iter().any(|s| *s == Signature::default())
        {
            return Err(RpcError::rejected(
                "signature verification failed",
                &json!("SignatureFailure"),
                Vec::new(),
            ));
        }

        let mut accounts = ledger.accounts.clone();
        let fee = FEE_PER_SIGNATURE * tx.signatures.len() as u64;
        if debit(&mut accounts, &message.account_keys[0], fee).is_err() {
            return Err(RpcError::rejected(
                "Attempt to debit an account but found no record of a prior credit.",
                &json!("AccountNotFound"),
                Vec::new(),
            ));
        }

        for (index, ix) in message.compiled_instructions.iter().enumerate() {
            let program = message.account_keys[ix.program_id_index as usize];
            let keys: Vec<Pubkey> = ix
                .account_indices
                .iter()
                .map(|i| message.account_keys[*i as usize])
                .collect();
            let ctx = Ctx {
                accounts: &mut accounts,
                signers: signer_keys,
                slot: ledger.slot,
                program_id: self.program_id,
            };

            let result = if program == SYSTEM_PROGRAM_ID {
                system_program(ctx, &keys, &ix.data)
            } else if program == TOKEN_PROGRAM_ID {
                token_program(ctx, &keys, &ix.data)
            } else if program == ASSOCIATED_TOKEN_PROGRAM_ID {
                ata_program(ctx, &keys, &ix.data)
            } else if program == self.program_id {
                solbank_program(ctx, &keys, &ix.data)
            } else {
                Err(json!("ProgramAccountNotFound"))
            };

            if let Err(code) = result {
                let err = json!({ "InstructionError": [index, code] });
                return Err(RpcError::rejected(
                    format!(
                        "Transaction simulation failed: Error processing Instruction {index}: {code}"
                    ),
                    &err,
                    vec![format!("Program {program} failed: {code}")],
                ));
            }
        }

        ledger.accounts = accounts;
        Ok(())
    }

    fn cheat(&self, ledger: &mut Ledger, method: &str, params: &Value) -> Result<(), RpcError> {
        match method {
            "surfnet_setAccount" => {
                let address = pubkey_param(&params[0])?;
                let fields = &params[1];
                let data = fields["data"]
                    .as_str()
                    .and_then(|d| hex::decode(d).ok())
                    .ok_or_else(invalid_params)?;
                let account = Account {
                    lamports: fields["lamports"].as_u64().ok_or_else(invalid_params)?,
                    data,
                    owner: pubkey_param(&fields["owner"])?,
                    executable: fields["executable"].as_bool().ok_or_else(invalid_params)?,
                };
                ledger.accounts.insert(address, account);
            }
            "surfnet_setTokenAccount" => {
                let owner = pubkey_param(&params[0])?;
                let mint = pubkey_param(&params[1])?;
                let amount = params[2]["amount"].as_u64().ok_or_else(invalid_params)?;
                let token_program = pubkey_param(&params[3])?;
                let ata = derive_associated_token_address(&owner, &mint, &token_program)?;

                let mut token = ledger
                    .accounts
                    .get(&ata)
                    .and_then(|a| TokenAccount::unpack(&a.data).ok())
                    .unwrap_or_else(|| TokenAccount::new(mint, owner, 0));
                token.amount = amount;
                ledger.accounts.insert(
                    ata,
                    Account {
                        lamports: rent_exempt_minimum(TOKEN_ACCOUNT_LEN),
                        data: token.pack().to_vec(),
                        owner: token_program,
                        executable: false,
                    },
                );
            }
            _ => {
                return Err(RpcError::Rpc {
                    code: -32601,
                    message: "Method not found".into(),
                })
            }
        }
        ledger.cheat_calls.push(method.to_string());
        Ok(())
    }
}

#[async_trait]
impl RawRpc for MockRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let mut ledger = self.ledger.lock().unwrap();
        self.cheat(&mut ledger, method, &params)?;
        Ok(json!({ "context": { "slot": ledger.slot }, "value": null }))
    }
}

#[async_trait]
impl RpcConnection for MockRpc {
    fn url(&self) -> &str {
        &self.url
    }

    fn commitment(&self) -> Commitment {
        Commitment::Confirmed
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcError> {
        Ok(self.lamports(address))
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RpcError> {
        Ok(self.account(address))
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcError> {
        Ok(rent_exempt_minimum(data_len))
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let slot = self.ledger.lock().unwrap().slot;
        let mut hash = [0x42u8; 32];
        hash[..8].copy_from_slice(&slot.to_le_bytes());
        Ok(hash)
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        Ok(self.ledger.lock().unwrap().slot)
    }

    async fn send_transaction(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<Signature, RpcError> {
        let mut ledger = self.ledger.lock().unwrap();
        self.execute(&mut ledger, transaction)?;
        let signature = transaction.signature();
        let slot = ledger.slot;
        ledger.statuses.insert(
            signature,
            SignatureStatus {
                slot,
                confirmation_status: Some(Commitment::Confirmed),
                err: None,
            },
        );
        ledger.slot += 1;
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        Ok(self.ledger.lock().unwrap().statuses.get(signature).cloned())
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), RpcError> {
        match self.get_signature_status(signature).await? {
            Some(_) => Ok(()),
            None => Err(RpcError::ConfirmationTimeout {
                signature: signature.to_string(),
                timeout: std::time::Duration::ZERO,
            }),
        }
    }

    async fn request_airdrop(
        &self,
        address: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, RpcError> {
        let mut ledger = self.ledger.lock().unwrap();
        if ledger.faucet_down {
            return Err(RpcError::Rpc {
                code: -32603,
                message: "Internal error: airdrop request failed".into(),
            });
        }
        credit(&mut ledger.accounts, address, lamports);
        ledger.airdrops += 1;
        Ok(ledger.record())
    }
}

// ---------------------------------------------------------------------------
// Program simulation
// ---------------------------------------------------------------------------

struct Ctx<'a> {
    accounts: &'a mut HashMap<Pubkey, Account>,
    signers: &'a [Pubkey],
    slot: u64,
    program_id: Pubkey,
}

type Exec = Result<(), Value>;

fn custom(code: u32) -> Value {
    json!({ "Custom": code })
}

fn invalid_params() -> RpcError {
    RpcError::Rpc {
        code: -32602,
        message: "Invalid params".into(),
    }
}

fn pubkey_param(value: &Value) -> Result<Pubkey, RpcError> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid_params)
}

fn credit(accounts: &mut HashMap<Pubkey, Account>, address: &Pubkey, lamports: u64) {
    accounts
        .entry(*address)
        .or_insert_with(|| Account {
            lamports: 0,
            data: Vec::new(),
            owner: SYSTEM_PROGRAM_ID,
            executable: false,
        })
        .lamports += lamports;
}

fn debit(accounts: &mut HashMap<Pubkey, Account>, address: &Pubkey, lamports: u64) -> Exec {
    match accounts.get_mut(address) {
        Some(account) if account.lamports >= lamports => {
            account.lamports -= lamports;
            Ok(())
        }
        _ => Err(custom(1)),
    }
}

fn u64_at(data: &[u8], offset: usize) -> Result<u64, Value> {
    data.get(offset..offset + 8)
        .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(|| json!("InvalidInstructionData"))
}

fn pubkey_at(data: &[u8], offset: usize) -> Result<Pubkey, Value> {
    data.get(offset..offset + 32)
        .map(|b| Pubkey::new_from_array(b.try_into().unwrap()))
        .ok_or_else(|| json!("InvalidInstructionData"))
}

fn token_account(ctx: &Ctx<'_>, address: &Pubkey) -> Result<TokenAccount, Value> {
    ctx.accounts
        .get(address)
        .filter(|a| a.owner == TOKEN_PROGRAM_ID)
        .and_then(|a| TokenAccount::unpack(&a.data).ok())
        .ok_or_else(|| json!("UninitializedAccount"))
}

fn store_token_account(ctx: &mut Ctx<'_>, address: &Pubkey, token: &TokenAccount) {
    if let Some(account) = ctx.accounts.get_mut(address) {
        account.data = token.pack().to_vec();
    }
}

fn create_token_account(
    ctx: &mut Ctx<'_>,
    payer: &Pubkey,
    address: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
) -> Exec {
    let lamports = rent_exempt_minimum(TOKEN_ACCOUNT_LEN);
    debit(ctx.accounts, payer, lamports)?;
    ctx.accounts.insert(
        *address,
        Account {
            lamports,
            data: TokenAccount::new(*mint, *owner, 0).pack().to_vec(),
            owner: TOKEN_PROGRAM_ID,
            executable: false,
        },
    );
    Ok(())
}

/// SPL Token error 1 (`InsufficientFunds`) when `source` is short.
fn move_tokens(ctx: &mut Ctx<'_>, source: &Pubkey, destination: &Pubkey, amount: u64) -> Exec {
    let mut from = token_account(ctx, source)?;
    let mut to = token_account(ctx, destination)?;
    if from.mint != to.mint {
        return Err(custom(3));
    }
    if from.amount < amount {
        return Err(custom(1));
    }
    from.amount -= amount;
    to.amount += amount;
    store_token_account(ctx, source, &from);
    store_token_account(ctx, destination, &to);
    Ok(())
}

fn system_program(ctx: Ctx<'_>, keys: &[Pubkey], data: &[u8]) -> Exec {
    if data.len() != 52 || data[..4] != [0, 0, 0, 0] {
        return Err(json!("InvalidInstructionData"));
    }
    let lamports = u64_at(data, 4)?;
    let space = u64_at(data, 12)?;
    let owner = pubkey_at(data, 20)?;
    let (from, new) = (keys[0], keys[1]);

    if !ctx.signers.contains(&new) {
        return Err(json!("MissingRequiredSignature"));
    }
    if ctx.accounts.contains_key(&new) {
        return Err(custom(0));
    }
    debit(ctx.accounts, &from, lamports)?;
    ctx.accounts.insert(
        new,
        Account {
            lamports,
            data: vec![0; space as usize],
            owner,
            executable: false,
        },
    );
    Ok(())
}

fn token_program(mut ctx: Ctx<'_>, keys: &[Pubkey], data: &[u8]) -> Exec {
    match data.first() {
        Some(20) => {
            let account = ctx
                .accounts
                .get_mut(&keys[0])
                .filter(|a| a.owner == TOKEN_PROGRAM_ID && a.data.len() == MINT_LEN)
                .ok_or_else(|| json!("InvalidAccountData"))?;
            if account.data[45] != 0 {
                return Err(custom(6));
            }
            let decimals = *data.get(1).ok_or_else(|| json!("InvalidInstructionData"))?;
            let mint_authority = pubkey_at(data, 2)?;
            let freeze_authority = match data.get(34) {
                Some(1) => Some(pubkey_at(data, 35)?),
                _ => None,
            };
            let mint = Mint {
                mint_authority: Some(mint_authority),
                supply: 0,
                decimals,
                is_initialized: true,
                freeze_authority,
            };
            account.data = mint.pack().to_vec();
            Ok(())
        }
        Some(7) => {
            let (mint_key, destination, authority) = (keys[0], keys[1], keys[2]);
            let amount = u64_at(data, 1)?;
            if !ctx.signers.contains(&authority) {
                return Err(json!("MissingRequiredSignature"));
            }
            let mint_account = ctx
                .accounts
                .get(&mint_key)
                .ok_or_else(|| json!("InvalidAccountData"))?;
            let mut mint =
                Mint::unpack(&mint_account.data).map_err(|_| json!("InvalidAccountData"))?;
            if mint.mint_authority != Some(authority) {
                return Err(custom(4));
            }
            let mut token = token_account(&ctx, &destination)?;
            if token.mint != mint_key {
                return Err(custom(3));
            }
            token.amount += amount;
            mint.supply += amount;
            store_token_account(&mut ctx, &destination, &token);
            if let Some(account) = ctx.accounts.get_mut(&mint_key) {
                account.data = mint.pack().to_vec();
            }
            Ok(())
        }
        Some(3) => {
            let (source, destination, owner) = (keys[0], keys[1], keys[2]);
            let amount = u64_at(data, 1)?;
            if !ctx.signers.contains(&owner) {
                return Err(json!("MissingRequiredSignature"));
            }
            if token_account(&ctx, &source)?.owner != owner {
                return Err(custom(4));
            }
            move_tokens(&mut ctx, &source, &destination, amount)
        }
        _ => Err(json!("InvalidInstructionData")),
    }
}

fn ata_program(mut ctx: Ctx<'_>, keys: &[Pubkey], data: &[u8]) -> Exec {
    if data != [1u8].as_slice() {
        return Err(json!("InvalidInstructionData"));
    }
    let (payer, ata, owner, mint, token_program) = (keys[0], keys[1], keys[2], keys[3], keys[5]);
    let expected = derive_associated_token_address(&owner, &mint, &token_program)
        .map_err(|_| json!("InvalidSeeds"))?;
    if expected != ata {
        return Err(json!("InvalidSeeds"));
    }
    if ctx.accounts.contains_key(&ata) {
        return Ok(());
    }
    if !ctx.accounts.contains_key(&mint) {
        return Err(json!("InvalidAccountData"));
    }
    create_token_account(&mut ctx, &payer, &ata, &mint, &owner)
}

/// Anchor `ConstraintSeeds`.
const CONSTRAINT_SEEDS: u32 = 2006;
/// Anchor `AccountNotInitialized`.
const ACCOUNT_NOT_INITIALIZED: u32 = 3012;

fn solbank_program(mut ctx: Ctx<'_>, keys: &[Pubkey], data: &[u8]) -> Exec {
    if data.len() < 8 {
        return Err(custom(100));
    }
    let tag: [u8; 8] = data[..8].try_into().unwrap();
    let (vault, _) = vault_address(&ctx.program_id).map_err(|_| custom(CONSTRAINT_SEEDS))?;
    let (program_state, _) =
        program_state_address(&ctx.program_id).map_err(|_| custom(CONSTRAINT_SEEDS))?;

    match tag {
        INITIALIZE_DISCRIMINATOR => {
            let (state_key, vault_key, user) = (keys[0], keys[1], keys[2]);
            if state_key != program_state || vault_key != vault {
                return Err(custom(CONSTRAINT_SEEDS));
            }
            if ctx.accounts.contains_key(&program_state) {
                return Err(custom(0));
            }
            let state_rent = rent_exempt_minimum(ProgramState::LEN);
            let vault_rent = rent_exempt_minimum(0);
            debit(ctx.accounts, &user, state_rent + vault_rent)?;
            ctx.accounts.insert(
                program_state,
                Account {
                    lamports: state_rent,
                    data: ProgramState { slot: ctx.slot }.pack().to_vec(),
                    owner: ctx.program_id,
                    executable: false,
                },
            );
            ctx.accounts.insert(
                vault,
                Account {
                    lamports: vault_rent,
                    data: Vec::new(),
                    owner: ctx.program_id,
                    executable: false,
                },
            );
            Ok(())
        }
        DEPOSIT_SOL_DISCRIMINATOR | WITHDRAW_SOL_DISCRIMINATOR => {
            let (vault_key, user) = (keys[0], keys[1]);
            if vault_key != vault {
                return Err(custom(CONSTRAINT_SEEDS));
            }
            if !ctx.accounts.contains_key(&vault) {
                return Err(custom(ACCOUNT_NOT_INITIALIZED));
            }
            let lamports = u64_at(data, 8)?;
            if tag == DEPOSIT_SOL_DISCRIMINATOR {
                debit(ctx.accounts, &user, lamports)?;
                credit(ctx.accounts, &vault, lamports);
            } else {
                let available = ctx.accounts[&vault]
                    .lamports
                    .saturating_sub(rent_exempt_minimum(0));
                if available < lamports {
                    return Err(custom(6000));
                }
                debit(ctx.accounts, &vault, lamports)?;
                credit(ctx.accounts, &user, lamports);
            }
            Ok(())
        }
        DEPOSIT_TOKEN_DISCRIMINATOR => {
            let (vault_token, user_token, vault_key, mint, user) =
                (keys[0], keys[1], keys[2], keys[3], keys[4]);
            check_token_accounts(vault, vault_key, vault_token, user_token, &mint, &user)?;
            if !ctx.signers.contains(&user) {
                return Err(json!("MissingRequiredSignature"));
            }
            if !ctx.accounts.contains_key(&vault_token) {
                create_token_account(&mut ctx, &user, &vault_token, &mint, &vault)?;
            }
            let amount = u64_at(data, 8)?;
            move_tokens(&mut ctx, &user_token, &vault_token, amount)
        }
        WITHDRAW_TOKEN_DISCRIMINATOR => {
            let (state_key, vault_token, user_token, vault_key, mint, user) =
                (keys[0], keys[1], keys[2], keys[3], keys[4], keys[5]);
            if state_key != program_state {
                return Err(custom(CONSTRAINT_SEEDS));
            }
            check_token_accounts(vault, vault_key, vault_token, user_token, &mint, &user)?;

            let state = ctx
                .accounts
                .get(&program_state)
                .and_then(|a| ProgramState::unpack(&a.data).ok())
                .ok_or_else(|| custom(ACCOUNT_NOT_INITIALIZED))?;
            if ctx.slot < state.earliest_withdrawal_slot() {
                return Err(custom(6001));
            }
            let amount = u64_at(data, 8)?;
            if token_account(&ctx, &vault_token)?.amount < amount {
                return Err(custom(6000));
            }
            move_tokens(&mut ctx, &vault_token, &user_token, amount)
        }
        _ => Err(custom(101)),
    }
}

fn check_token_accounts(
    vault: Pubkey,
    vault_key: Pubkey,
    vault_token: Pubkey,
    user_token: Pubkey,
    mint: &Pubkey,
    user: &Pubkey,
) -> Exec {
    let seeds = |owner: &Pubkey| {
        derive_associated_token_address(owner, mint, &TOKEN_PROGRAM_ID)
            .map_err(|_| custom(CONSTRAINT_SEEDS))
    };
    if vault_key != vault || vault_token != seeds(&vault)? || user_token != seeds(user)? {
        return Err(custom(CONSTRAINT_SEEDS));
    }
    Ok(())
}
