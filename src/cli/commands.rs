use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ledger-core")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "Path to a TOML settings file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "init", about = "Open the ledger, creating the genesis block if needed")]
    Init,
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(name = "listwallets", about = "Print local wallet owner keys")]
    ListWallets,
    #[command(name = "balance", about = "Sum the unspent outputs of an owner key")]
    GetBalance {
        #[arg(help = "Hex-encoded owner key")]
        owner_key: String,
    },
    #[command(name = "send", about = "Pool a payment between wallets and mine it")]
    Send {
        #[arg(help = "Owner key of a local wallet")]
        from: String,
        #[arg(help = "Hex-encoded receiver key")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
        #[arg(long = "fee", default_value_t = 0, help = "Fee burned by the transaction")]
        fee: u64,
        #[arg(long = "miner", help = "Reward key for the block, defaults to the sender")]
        miner: Option<String>,
        #[arg(long = "no-mine", help = "Leave the transaction in the pool")]
        no_mine: bool,
    },
    #[command(name = "mine", about = "Mine the pooled transactions into a block")]
    Mine {
        #[arg(help = "Hex-encoded key receiving the block reward")]
        miner: String,
    },
    #[command(name = "findtx", about = "Look up a transaction by id")]
    FindTx {
        #[arg(help = "Transaction id")]
        txid: String,
    },
    #[command(name = "printchain", about = "Print all blocks, tip first")]
    Printchain,
    #[command(name = "reindexutxo", about = "Rebuild UTXO index set")]
    Reindexutxo,
    #[command(name = "verifychain", about = "Check links and proof-of-work of every block")]
    Verifychain,
}
