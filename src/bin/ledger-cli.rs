use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use content_ledger_client::blockchain::LedgerError;
use content_ledger_client::connection::ConnectionState;
use content_ledger_client::contract::DesignArgs;
use content_ledger_client::lifecycle::startup;
use content_ledger_client::ContentClient;

/// Environment variable holding the signing credential for write commands.
const CREDENTIAL_ENV: &str = "CONTENT_LEDGER_PRIVATE_KEY";

#[derive(Parser)]
#[command(name = "ledger-cli")]
#[command(about = "One-shot reads and writes against the DigitalContentObject contract", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "ledger.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key pair (no connection needed)
    NewAddress,
    /// Show a registered design
    Spec { spec_id: U256 },
    /// Show the supply limit of a design
    SupplyLimit { spec_id: U256 },
    /// Show the owner of a design
    SpecOwner { spec_id: U256 },
    /// Show a minted object
    Object { object_id: U256 },
    /// Show the index of a minted object
    ObjectIndex { object_id: U256 },
    /// List objects owned by an address
    Owned { owner: Address },
    /// Register a new design
    Design {
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "")]
        content_type: String,
        #[arg(long)]
        media_id: String,
        #[arg(long)]
        supply_limit: U256,
        #[arg(long, default_value = "")]
        info: String,
        #[arg(long, value_delimiter = ',')]
        original_spec_ids: Vec<U256>,
        #[arg(long, default_value = "")]
        contract_documents: String,
        #[arg(long, default_value = "0")]
        copyright_fee_ratio: U256,
        #[arg(long)]
        allow_secondary_market: bool,
    },
    /// Mint an object of a design
    Mint {
        to: Address,
        spec_id: U256,
        media_id: String,
        #[arg(default_value = "")]
        info: String,
    },
    /// Transfer an owned object
    Transfer { to: Address, object_id: U256 },
    /// Transfer an object on behalf of its owner
    TransferFrom {
        from: Address,
        to: Address,
        object_id: U256,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::NewAddress = cli.command {
        return print_json(&ContentClient::create_address());
    }

    let (_config, client) = startup::bootstrap(&cli.config)?;
    if client.connect().await != ConnectionState::Connected {
        client.shutdown().await;
        return Err(LedgerError::NotConnected.into());
    }

    let result = run(&client, cli.command).await;
    client.shutdown().await;
    result
}

async fn run(client: &ContentClient, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::NewAddress => print_json(&ContentClient::create_address()),
        Commands::Spec { spec_id } => print_json(&client.get_digital_content_spec(spec_id).await?),
        Commands::SupplyLimit { spec_id } => print_json(&client.total_supply_limit_of(spec_id).await?),
        Commands::SpecOwner { spec_id } => print_json(&client.spec_owner_of(spec_id).await?),
        Commands::Object { object_id } => {
            print_json(&client.get_digital_content_object(object_id).await?)
        }
        Commands::ObjectIndex { object_id } => print_json(&client.object_index_of(object_id).await?),
        Commands::Owned { owner } => print_json(&client.owned_objects_of(owner).await?),
        Commands::Design {
            name,
            symbol,
            content_type,
            media_id,
            supply_limit,
            info,
            original_spec_ids,
            contract_documents,
            copyright_fee_ratio,
            allow_secondary_market,
        } => {
            let (sender, credential) = credential()?;
            let args = DesignArgs {
                name,
                symbol,
                content_type,
                media_id,
                total_supply_limit: supply_limit,
                info,
                original_spec_ids,
                contract_documents,
                copyright_fee_ratio,
                allow_secondary_market,
            };
            print_json(&client.design(sender, &credential, args).await?)
        }
        Commands::Mint {
            to,
            spec_id,
            media_id,
            info,
        } => {
            let (sender, credential) = credential()?;
            print_json(&client.mint(sender, &credential, to, spec_id, media_id, info).await?)
        }
        Commands::Transfer { to, object_id } => {
            let (sender, credential) = credential()?;
            print_json(&client.transfer(sender, &credential, to, object_id).await?)
        }
        Commands::TransferFrom {
            from,
            to,
            object_id,
        } => {
            let (sender, credential) = credential()?;
            print_json(&client.transfer_from(sender, &credential, from, to, object_id).await?)
        }
    }
}

/// Credential from the environment and the address it controls.
fn credential() -> Result<(Address, String), Box<dyn std::error::Error>> {
    let credential = std::env::var(CREDENTIAL_ENV)
        .map_err(|_| format!("{} must be set for write commands", CREDENTIAL_ENV))?;
    let sender = ContentClient::address_of(&credential)?;
    Ok((sender, credential))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
