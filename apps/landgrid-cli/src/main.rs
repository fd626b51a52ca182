use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use landgrid_common::{AccountId, CoordLayout, DEFAULT_FIELD_BITS, TokenId, parse_coordinate};
use landgrid_persist::RegistryStore;
use landgrid_registry::{
    CoordinateRegistry, OwnershipRegistry, RegistryConfig, RegistryError, RegistryHandle,
    Transfer,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "landgrid-cli", about = "CLI tool for the landgrid parcel registry")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// A parcel address. Coordinates accept decimals and truncate toward zero.
#[derive(Args, Clone, Copy)]
struct ParcelArgs {
    world: u64,
    #[arg(allow_hyphen_values = true, value_parser = parse_coordinate)]
    x: i128,
    #[arg(allow_hyphen_values = true, value_parser = parse_coordinate)]
    y: i128,
}

#[derive(Args)]
struct StoreArgs {
    /// Registry store directory
    #[arg(short, long, default_value = "landgrid-store")]
    store: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack (world, x, y) into a token id
    Encode {
        #[command(flatten)]
        parcel: ParcelArgs,
        /// Coordinate field width in bits
        #[arg(long, default_value_t = DEFAULT_FIELD_BITS)]
        field_bits: u32,
    },
    /// Unpack a hex token id into (world, x, y)
    Decode {
        token_id: TokenId,
        /// Coordinate field width in bits
        #[arg(long, default_value_t = DEFAULT_FIELD_BITS)]
        field_bits: u32,
    },
    /// Initialize a new registry store
    Init {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long, default_value = "Block42 World")]
        name: String,
        #[arg(long, default_value = "B42WD")]
        symbol: String,
        /// Registry owner account (random if omitted)
        #[arg(long)]
        owner: Option<AccountId>,
        #[arg(long, default_value_t = DEFAULT_FIELD_BITS)]
        field_bits: u32,
    },
    /// Create a parcel, owned by the caller or by --to
    Create {
        #[command(flatten)]
        store: StoreArgs,
        /// Calling account
        #[arg(long = "as")]
        caller: AccountId,
        #[arg(long)]
        to: Option<AccountId>,
        #[command(flatten)]
        parcel: ParcelArgs,
    },
    /// Transfer a parcel
    Transfer {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long = "as")]
        caller: AccountId,
        #[arg(long)]
        to: AccountId,
        #[command(flatten)]
        parcel: ParcelArgs,
    },
    /// Reassign a parcel to the registry owner
    Expropriate {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long = "as")]
        caller: AccountId,
        #[command(flatten)]
        parcel: ParcelArgs,
    },
    /// Print the owner of a parcel
    Owner {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        parcel: ParcelArgs,
    },
    /// Print an account's parcel count
    Balance {
        #[command(flatten)]
        store: StoreArgs,
        account: AccountId,
    },
    /// Write a snapshot of the current registry state
    Snapshot {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Check the store's integrity chain and ledger consistency
    Verify {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Run the create / transfer / expropriate walkthrough in memory
    Demo,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Encode { parcel, field_bits } => {
            let layout = CoordLayout::new(field_bits)?;
            println!("{}", layout.encode(parcel.world, parcel.x, parcel.y));
        }
        Commands::Decode {
            token_id,
            field_bits,
        } => {
            let coord = CoordLayout::new(field_bits)?.decode(token_id);
            println!("world={} x={} y={}", coord.world_id, coord.x, coord.y);
        }
        Commands::Init {
            store,
            name,
            symbol,
            owner,
            field_bits,
        } => {
            let owner = owner.unwrap_or_else(AccountId::new);
            let layout = CoordLayout::new(field_bits)?;
            RegistryStore::create(&store.store, RegistryConfig::new(name, symbol, owner), layout)?;
            println!("initialized {} (owner {owner})", store.store.display());
        }
        Commands::Create {
            store,
            caller,
            to,
            parcel,
        } => mutate(&store, |land| {
            land.create_and_transfer(
                caller,
                to.unwrap_or(caller),
                parcel.world,
                parcel.x,
                parcel.y,
            )
        })?,
        Commands::Transfer {
            store,
            caller,
            to,
            parcel,
        } => mutate(&store, |land| {
            land.transfer(caller, to, parcel.world, parcel.x, parcel.y)
        })?,
        Commands::Expropriate {
            store,
            caller,
            parcel,
        } => mutate(&store, |land| {
            land.expropriate(caller, parcel.world, parcel.x, parcel.y)
        })?,
        Commands::Owner { store, parcel } => {
            let (_, land) = open(&store)?;
            let owner = land.owner_of(parcel.world, parcel.x, parcel.y)?;
            println!("{owner}");
        }
        Commands::Balance { store, account } => {
            let (_, land) = open(&store)?;
            println!("{}", land.balance_of(account));
        }
        Commands::Snapshot { store } => {
            let (mut registry_store, land) = open(&store)?;
            land.registry()
                .write(|registry| registry_store.take_snapshot(registry))?;
            println!(
                "snapshot {} written",
                registry_store.meta().snapshot_count
            );
        }
        Commands::Verify { store } => {
            let (registry_store, land) = open(&store)?;
            registry_store.verify_integrity()?;
            let consistent = land.registry().read(|r| r.ledger().is_consistent());
            if !consistent {
                anyhow::bail!("ledger balances do not match parcel owners");
            }
            println!(
                "ok: {} parcels, {} events, {} snapshots",
                land.registry().total_supply(),
                registry_store.meta().event_count,
                registry_store.meta().snapshot_count
            );
        }
        Commands::Demo => demo()?,
    }

    Ok(())
}

/// Open a store and wrap its latest state in a coordinate veneer.
fn open(args: &StoreArgs) -> anyhow::Result<(RegistryStore, CoordinateRegistry)> {
    let store = RegistryStore::open(&args.store)
        .with_context(|| format!("opening store {}", args.store.display()))?;
    let registry = store.load_latest()?;
    let name = format!("{} Land", store.config().name);
    let land = CoordinateRegistry::with_layout(
        name,
        store.config().symbol.clone(),
        RegistryHandle::new(registry),
        store.layout(),
    );
    Ok((store, land))
}

/// Apply one mutation and persist its event.
fn mutate(
    args: &StoreArgs,
    op: impl FnOnce(&CoordinateRegistry) -> Result<Transfer, RegistryError>,
) -> anyhow::Result<()> {
    let (mut store, land) = open(args)?;
    let transfer = op(&land)?;
    land.registry().write(|registry| store.commit(registry))?;
    print_transfer(&transfer);
    Ok(())
}

fn print_transfer(t: &Transfer) {
    let from = t
        .from
        .map_or_else(|| "-".to_string(), |from| from.to_string());
    println!("Transfer {from} -> {} token={}", t.to, t.token_id);
}

fn demo() -> anyhow::Result<()> {
    let (a, b, c) = (AccountId::new(), AccountId::new(), AccountId::new());
    println!("registry owner A={a}\nB={b}\nC={c}");

    let world = RegistryHandle::new(OwnershipRegistry::new(RegistryConfig::new(
        "Block42 World",
        "B42WD",
        a,
    )));
    let land = CoordinateRegistry::new("Block42 Land", "B42LD", world.clone());

    print_transfer(&world.create(a, TokenId::ZERO)?);
    print_transfer(&land.create_and_transfer(a, b, 0, 3, -2)?);
    print_transfer(&land.transfer(b, c, 0, 3, -2)?);

    match land.expropriate(b, 0, 3, -2) {
        Ok(_) => anyhow::bail!("expropriation by a non-owner must fail"),
        Err(e) => println!("rejected: {e}"),
    }
    print_transfer(&land.expropriate(a, 0, 3, -2)?);

    println!(
        "balances: A={} B={} C={}",
        world.balance_of(a),
        world.balance_of(b),
        world.balance_of(c)
    );

    let events = world.read(|r| r.events().to_vec());
    let replayed = OwnershipRegistry::replay(world.read(|r| r.config().clone()), &events);
    println!(
        "replay of {} events: {}",
        events.len(),
        if replayed.state_hash() == world.read(|r| r.state_hash()) {
            "OK"
        } else {
            "MISMATCH"
        }
    );
    Ok(())
}
