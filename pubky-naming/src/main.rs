use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use pubky_naming::{
    logging, BlockStore, BootstrapConfig, ConfigRepo, DataDir, FileKeychain, FileRepo,
    LocalResolver, NamePublisher, NodeIdentity, NodeStatus, PkarrClientBuilder,
    PkarrNamingEngine, PublishOptions, ResetOptions,
};

/// Environment variable holding the keychain passphrase.
const PASSPHRASE_ENV: &str = "PUBKY_NAMING_PASSPHRASE";

#[derive(Parser, Debug)]
#[clap(version, about = "Publish content paths under pkarr keys")]
struct Cli {
    /// Node data directory.
    #[clap(short, long, default_value = "~/.pubky-naming")]
    data_dir: PathBuf,
    /// [tracing_subscriber::EnvFilter], overrides the configured log level.
    #[clap(short, long)]
    tracing_env_filter: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the data directory, default config and node key.
    Init,
    /// Store a file in the block store and print its path.
    Add { file: PathBuf },
    /// Publish a path under the node key or a named key.
    Publish {
        /// `/blob/<hash>`, `/pkarr/<key>`, a bare hash or a bare public key.
        value: String,
        /// Keychain key to sign with.
        #[clap(short, long, default_value = "self")]
        key: String,
        /// How long the record stays valid, e.g. `24h` or `90m`.
        #[clap(short, long)]
        lifetime: Option<String>,
        /// Skip checking that the path can be resolved.
        #[clap(long)]
        no_resolve: bool,
        /// Give up after this many milliseconds.
        #[clap(long)]
        timeout_ms: Option<u64>,
        /// Act as a node without network access.
        #[clap(long)]
        offline: bool,
    },
    /// Manage bootstrap peers.
    #[clap(subcommand)]
    Bootstrap(BootstrapCommand),
    /// Manage keychain keys.
    #[clap(subcommand)]
    Key(KeyCommand),
}

#[derive(Subcommand, Debug)]
enum BootstrapCommand {
    /// Print the configured peers.
    List,
    /// Restore the default peers.
    Reset {
        #[clap(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    /// Generate a new key.
    Gen { name: String },
    /// List stored keys.
    List,
    /// Remove a key.
    Rm { name: String },
}

fn keychain(data_dir: &DataDir) -> FileKeychain {
    let passphrase = std::env::var(PASSPHRASE_ENV).unwrap_or_default();
    FileKeychain::new(data_dir.keystore_dir(), passphrase)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let data_dir = DataDir::new(args.data_dir);
    logging::init_tracing_logs_from_data_dir(&data_dir, args.tracing_env_filter.as_deref())?;

    match args.command {
        Command::Init => {
            data_dir.ensure_data_dir_exists_and_is_accessible()?;
            data_dir.read_or_create_config_file()?;
            let keypair = data_dir.read_or_create_keypair()?;
            println!("Initialized {}", data_dir.path().display());
            println!("Node key: {}", keypair.public_key());
        }
        Command::Add { file } => {
            let data = tokio::fs::read(&file).await?;
            let hash = BlockStore::file_system(&data_dir.blocks_dir())?
                .put(data)
                .await?;
            println!("/blob/{}", hash.to_hex());
        }
        Command::Publish {
            value,
            key,
            lifetime,
            no_resolve,
            timeout_ms,
            offline,
        } => {
            data_dir.ensure_data_dir_exists_and_is_accessible()?;
            let config = data_dir.read_or_create_config_file()?;
            let identity = NodeIdentity::new(data_dir.read_or_create_keypair()?);
            let client = PkarrClientBuilder::from(&config).build()?;
            let engine = Arc::new(PkarrNamingEngine::new(client));
            let blocks = BlockStore::file_system(&data_dir.blocks_dir())?;
            let resolver = LocalResolver::new(blocks, engine.clone());

            let publisher = NamePublisher::new(
                identity,
                Arc::new(NodeStatus::new(!offline)),
                Arc::new(keychain(&data_dir)),
                Arc::new(resolver),
                engine,
            );

            let mut options = PublishOptions::from(&config.naming).key(key);
            if let Some(lifetime) = lifetime {
                options = options.lifetime(lifetime);
            }
            if no_resolve {
                options = options.resolve(false);
            }
            if let Some(ms) = timeout_ms {
                options = options.timeout(Duration::from_millis(ms));
            }

            let result = publisher.publish(&value, options).await?;
            println!("Published to {}: {}", result.name, result.value);
        }
        Command::Bootstrap(command) => {
            let repo = Arc::new(FileRepo::new(&data_dir));
            let bootstrap = BootstrapConfig::new(repo.clone());
            let peers = match command {
                BootstrapCommand::List => bootstrap.list().await?,
                BootstrapCommand::Reset { timeout_ms } => {
                    let config = repo.get_all().await?;
                    let mut options = ResetOptions::from(&config.naming);
                    if let Some(ms) = timeout_ms {
                        options = options.timeout(Duration::from_millis(ms));
                    }
                    bootstrap.reset(options).await?
                }
            };
            for peer in peers.peers {
                println!("{peer}");
            }
        }
        Command::Key(command) => {
            let keychain = keychain(&data_dir);
            match command {
                KeyCommand::Gen { name } => {
                    if std::env::var(PASSPHRASE_ENV).map_or(true, |p| p.is_empty()) {
                        anyhow::bail!("set {PASSPHRASE_ENV} to protect the keychain");
                    }
                    let info = keychain.generate_key(&name).await?;
                    println!("{} {}", info.name, info.public_key);
                }
                KeyCommand::List => {
                    for info in keychain.list_keys().await? {
                        println!("{} {}", info.name, info.public_key);
                    }
                }
                KeyCommand::Rm { name } => {
                    let info = keychain.remove_key(&name).await?;
                    println!("Removed {} {}", info.name, info.public_key);
                }
            }
        }
    }

    Ok(())
}
