//! seedwallet 命令行入口
//!
//! 每次调用都从文件存储加载注册表，修改后立即写回

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use seedwallet::{
    config::Config,
    domain::{amount, Account, ChainFamily},
    infrastructure::{logging, storage::FileStore},
    service::{AdapterSet, OrchestratorOptions, TracingSink, WalletOrchestrator},
    WalletError,
};

#[derive(Parser)]
#[command(name = "seedwallet")]
#[command(about = "Deterministic multi-chain wallet (Solana / Ethereum) from one secret phrase")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML 配置文件
    #[arg(short, long, global = true, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// 存储目录（覆盖配置）
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new 12-word secret phrase
    Generate {
        #[arg(long, default_value = "solana")]
        chain: ChainFamily,
    },
    /// Validate and load an existing secret phrase
    Import {
        #[arg(long, default_value = "solana")]
        chain: ChainFamily,
        /// Secret phrase (quoted)
        phrase: String,
    },
    /// Derive the next account
    Add {
        #[arg(long, default_value = "solana")]
        chain: ChainFamily,
        /// Secret phrase; not needed when PERSIST_SECRET=1 kept it from an earlier run
        #[arg(long, env = "SEEDWALLET_PHRASE", hide_env_values = true)]
        phrase: Option<String>,
    },
    /// List derived accounts
    List {
        #[arg(long)]
        chain: Option<ChainFamily>,
        /// Print private keys (hex)
        #[arg(long)]
        show_private_keys: bool,
    },
    /// Remove an account (its index is never reused)
    Remove {
        #[arg(long)]
        chain: ChainFamily,
        #[arg(long)]
        index: u32,
    },
    /// Refresh balances from the chain
    Balance {
        #[arg(long)]
        chain: ChainFamily,
        /// Single account; all accounts of the chain when omitted
        #[arg(long)]
        index: Option<u32>,
    },
    /// Send native tokens
    Send {
        #[arg(long)]
        chain: ChainFamily,
        #[arg(long)]
        index: u32,
        #[arg(long)]
        to: String,
        /// Amount in SOL / ETH, e.g. 0.25
        #[arg(long)]
        amount: Decimal,
    },
    /// Show where to request test funds
    Faucet {
        #[arg(long)]
        chain: ChainFamily,
        #[arg(long)]
        index: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env_and_file(cli.config.as_ref())?;
    if let Some(store) = cli.store.clone() {
        config.storage.path = store;
    }
    config.validate()?;

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tracing::debug!(
        solana_rpc = %config.network.solana_rpc_url,
        ethereum_rpc = %config.network.ethereum_rpc_url,
        store = %config.storage.path.display(),
        "configuration loaded"
    );

    let adapters = AdapterSet::from_config(&config.network)?;
    let store = Arc::new(FileStore::new(&config.storage.path));
    let options = OrchestratorOptions {
        persist_secret: config.storage.persist_secret,
    };
    let orchestrator =
        WalletOrchestrator::open(adapters, store, Arc::new(TracingSink), options).await?;

    if let Err(e) = run(cli.command, &orchestrator).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, orchestrator: &WalletOrchestrator) -> Result<()> {
    match command {
        Commands::Generate { chain } => {
            orchestrator.select_profile(chain).await;
            let secret = orchestrator.generate_secret().await?;
            println!("{}", secret.phrase());
            println!();
            println!(
                "Write these {} words down. They are the only way to recover your accounts.",
                secret.word_count()
            );
        }
        Commands::Import { chain, phrase } => {
            orchestrator.select_profile(chain).await;
            orchestrator.import_secret(&phrase).await?;
            println!("Secret phrase accepted for {}", chain);
        }
        Commands::Add { chain, phrase } => {
            orchestrator.select_profile(chain).await;
            if let Some(phrase) = phrase {
                orchestrator.import_secret(&phrase).await?;
            }
            let account = match orchestrator.request_account().await {
                Err(WalletError::NoSecret) => {
                    anyhow::bail!("No secret phrase loaded: pass --phrase or set SEEDWALLET_PHRASE")
                }
                other => other?,
            };
            print_account(&account, false);
        }
        Commands::List {
            chain,
            show_private_keys,
        } => {
            let accounts = match chain {
                Some(chain) => orchestrator.accounts_for(chain).await,
                None => orchestrator.accounts().await,
            };
            if accounts.is_empty() {
                println!("No accounts");
            }
            for account in &accounts {
                print_account(account, show_private_keys);
            }
        }
        Commands::Remove { chain, index } => {
            let removed = orchestrator.remove_account(chain, index).await?;
            println!("Removed {} #{} ({})", chain, index, removed.address());
        }
        Commands::Balance { chain, index } => match index {
            Some(index) => {
                let balance = orchestrator.refresh_balance(chain, index).await?;
                println!(
                    "{} #{}: {}",
                    chain,
                    index,
                    amount::format_native(balance, chain.profile())
                );
            }
            None => {
                for (index, result) in orchestrator.refresh_all(chain).await {
                    match result {
                        Ok(balance) => println!(
                            "{} #{}: {}",
                            chain,
                            index,
                            amount::format_native(balance, chain.profile())
                        ),
                        Err(e) => println!("{} #{}: {}", chain, index, e.user_message()),
                    }
                }
            }
        },
        Commands::Send {
            chain,
            index,
            to,
            amount,
        } => {
            let tx_id = orchestrator.transfer(chain, index, &to, amount).await?;
            println!("{}", tx_id);
        }
        Commands::Faucet { chain, index } => {
            let url = orchestrator.faucet(chain, index).await?;
            if let Some(account) = orchestrator.find(chain, index).await {
                println!("Address: {}", account.address());
            }
            println!("Faucet:  {}", url);
        }
    }

    Ok(())
}

fn print_account(account: &Account, show_private_key: bool) {
    let profile = account.chain_family().profile();
    println!(
        "{} #{}  {}  {}  {}",
        account.chain_family(),
        account.account_index(),
        account.address(),
        account.derivation_path(),
        amount::format_native(account.cached_balance(), profile)
    );
    if show_private_key {
        println!("    private key: {}", account.private_key_hex().as_str());
    }
}
