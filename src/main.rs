use clap::Parser;
use ledger_core::service::ErrorResponse;
use ledger_core::{
    decode_owner_key, Chain, Command, LedgerError, LedgerService, Opt, Result, Settings, Wallets,
    GLOBAL_SETTINGS,
};
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use std::process;

fn main() {
    let opt = Opt::parse();

    let settings = match opt.config.as_deref() {
        Some(path) => match Settings::load(Some(path)) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => GLOBAL_SETTINGS.clone(),
    };

    env_logger::builder()
        .filter_level(settings.log_level_filter())
        .parse_default_env()
        .init();

    if let Err(e) = run_command(opt.command, &settings) {
        error!("Error: {e}");
        if let Ok(body) = serde_json::to_string_pretty(&ErrorResponse::from(&e)) {
            eprintln!("{body}");
        }
        process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_service(settings: &Settings) -> Result<LedgerService> {
    let chain = Chain::initialize(settings.chain_db_path())?;
    Ok(LedgerService::new(chain))
}

fn run_command(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Init => {
            let service = open_service(settings)?;
            let chain = service.chain();
            print_json(&json!({
                "tip": chain.get_tip_hash()?,
                "height": chain.get_best_height()?,
                "path": chain.get_db_path(),
            }))?;
        }
        Command::Createwallet => {
            let mut wallets = Wallets::load(settings.wallet_path())?;
            let owner_key = wallets.create_wallet()?;
            info!("Created wallet {owner_key}");
            print_json(&json!({ "owner_key": owner_key }))?;
        }
        Command::ListWallets => {
            let wallets = Wallets::load(settings.wallet_path())?;
            print_json(&wallets.get_owner_keys())?;
        }
        Command::GetBalance { owner_key } => {
            let owner_key = decode_owner_key(&owner_key)?;
            let service = open_service(settings)?;
            print_json(&service.balance(&owner_key)?)?;
        }
        Command::Send {
            from,
            to,
            amount,
            fee,
            miner,
            no_mine,
        } => {
            let wallets = Wallets::load(settings.wallet_path())?;
            let wallet = wallets
                .get_wallet(&from)
                .ok_or_else(|| LedgerError::NotFound(format!("wallet {from}")))?;
            let receiver = decode_owner_key(&to)?;
            let miner = match miner {
                Some(miner) => decode_owner_key(&miner)?,
                None => wallet.get_public_key().to_vec(),
            };

            let service = open_service(settings)?;
            let submitted = service.send(wallet, &receiver, amount, fee)?;
            // The pool lives in this process only, so mine before exiting.
            if no_mine {
                print_json(&submitted)?;
            } else {
                let mined = service.mine(&miner)?;
                print_json(&json!({ "submitted": submitted, "mined": mined }))?;
            }
        }
        Command::Mine { miner } => {
            let miner = decode_owner_key(&miner)?;
            let service = open_service(settings)?;
            print_json(&service.mine(&miner)?)?;
        }
        Command::FindTx { txid } => {
            let service = open_service(settings)?;
            print_json(&service.find_transaction(&txid)?)?;
        }
        Command::Printchain => {
            let service = open_service(settings)?;
            print_json(&service.chain_summary()?)?;
        }
        Command::Reindexutxo => {
            let service = open_service(settings)?;
            let count = service.chain().reindex_utxo()?;
            print_json(&json!({ "utxo_entries": count }))?;
        }
        Command::Verifychain => {
            let service = open_service(settings)?;
            let height = service.chain().verify_integrity()?;
            print_json(&json!({ "valid": true, "height": height }))?;
        }
    }
    Ok(())
}
