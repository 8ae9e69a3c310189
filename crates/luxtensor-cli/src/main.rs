//! # LuxTensor CLI
//!
//! Command-line tools for LuxTensor blockchain.

use clap::Parser;

#[derive(Parser)]
#[clap(name = "luxtensor-cli")]
#[clap(about = "LuxTensor CLI tools", version)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Wallet operations
    Wallet {
        #[clap(subcommand)]
        cmd: WalletCommands,
    },
    
    /// Query blockchain
    Query {
        #[clap(subcommand)]
        cmd: QueryCommands,
    },
}

#[derive(Parser)]
enum WalletCommands {
    /// Create a new wallet
    Create {
        name: String,
    },
    
    /// Get wallet balance
    Balance {
        address: String,
    },
}

#[derive(Parser)]
enum QueryCommands {
    /// Get block by number
    Block {
        number: u64,
    },
    
    /// Get transaction by hash
    Transaction {
        hash: String,
    },
}

fn main() {
    let cli = Cli::parse();
    
    match cli.command {
        Commands::Wallet { cmd } => match cmd {
            WalletCommands::Create { name } => {
                println!("Creating wallet: {}", name);
                println!("Implementation coming in Phase 6!");
            }
            WalletCommands::Balance { address } => {
                println!("Querying balance for: {}", address);
                println!("Implementation coming in Phase 6!");
            }
        },
        Commands::Query { cmd } => match cmd {
            QueryCommands::Block { number } => {
                println!("Querying block: {}", number);
                println!("Implementation coming in Phase 6!");
            }
            QueryCommands::Transaction { hash } => {
                println!("Querying transaction: {}", hash);
                println!("Implementation coming in Phase 6!");
            }
        },
    }
}
