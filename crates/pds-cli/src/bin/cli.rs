use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pds_auth::{derive_policy_id, validate_did, Envelope, Method, Payload, SigningKey};
use pds_registry::RegistryConfig;

#[derive(Parser)]
#[command(name = "pds-cli")]
#[command(about = "PDS registry CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a secp256k1 key and a throwaway DID
    Keygen {
        /// Hex network id placed in the DID
        #[arg(long, default_value = "03")]
        network: String,
    },

    /// Build and sign a payload envelope
    Sign {
        /// Registry method, e.g. add_label
        #[arg(long)]
        method: String,
        #[arg(long)]
        label_id: Option<String>,
        #[arg(long)]
        data_id: Option<String>,
        #[arg(long)]
        policy_id: Option<String>,
        /// Height the signer last observed for the entity
        #[arg(long, default_value_t = 0)]
        base_height: u64,
        /// Signer reference `did#kid`
        #[arg(long)]
        kid: String,
        /// Hex-encoded private key
        #[arg(long)]
        key: String,
    },

    /// Decode an envelope without verifying it
    Inspect { token: String },

    /// Validate a DID
    CheckDid { did: String },

    /// Derive the policy id for a label and consumer key
    PolicyId {
        #[arg(long)]
        label_id: String,
        /// Hex SEC1 public key, compressed or not
        #[arg(long)]
        public_key: String,
    },

    /// Print the effective registry configuration
    Config {
        /// TOML file; `pds.toml` in the working directory when omitted
        #[arg(long)]
        path: Option<String>,
    },
}

#[derive(Serialize)]
struct KeyPair {
    did: String,
    kid: String,
    private_key: String,
    public_key: String,
}

fn keygen(network: &str) -> Result<KeyPair> {
    hex::decode(network).context("network id must be hex")?;
    let key = SigningKey::random(&mut OsRng);
    let id: [u8; 24] = rand::random();
    Ok(KeyPair {
        did: format!("did:icon:{}:{}", network, hex::encode(id)),
        kid: "key1".to_string(),
        private_key: hex::encode(key.to_bytes()),
        public_key: hex::encode(key.verifying_key().to_encoded_point(false).as_bytes()),
    })
}

fn build_payload(
    method: &str,
    label_id: Option<String>,
    data_id: Option<String>,
    policy_id: Option<String>,
    base_height: u64,
) -> Result<Payload> {
    let method = Method::parse(method).ok_or_else(|| anyhow!("unknown method {}", method))?;
    let mut builder = Payload::builder(method);
    if let Some(label_id) = label_id {
        builder = builder.label_id(label_id);
    }
    if let Some(data_id) = data_id {
        builder = builder.data_id(data_id);
    }
    if let Some(policy_id) = policy_id {
        builder = builder.policy_id(policy_id);
    }
    Ok(builder.base_height(base_height).build())
}

fn load_key(hex_key: &str) -> Result<SigningKey> {
    let bytes = hex::decode(hex_key.trim_start_matches("0x")).context("private key must be hex")?;
    SigningKey::from_slice(&bytes).map_err(|_| anyhow!("invalid secp256k1 private key"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { network } => {
            let pair = keygen(&network)?;
            info!("Generated key for {}", pair.did);
            print_json(&pair)?;
        }
        Commands::Sign {
            method,
            label_id,
            data_id,
            policy_id,
            base_height,
            kid,
            key,
        } => {
            let payload = build_payload(&method, label_id, data_id, policy_id, base_height)?;
            let token = Envelope::sign(&kid, &payload, &load_key(&key)?)?;
            println!("{}", token);
        }
        Commands::Inspect { token } => {
            let envelope = Envelope::parse(&token)?;
            print_json(&serde_json::json!({
                "header": envelope.header()?,
                "payload": envelope.payload()?,
                "signature": hex::encode(envelope.signature()?),
                "digest": hex::encode(envelope.digest()),
            }))?;
        }
        Commands::CheckDid { did } => match validate_did(&did) {
            Ok(did) => println!("DID valid: {}", did),
            Err(e) => {
                error!("{}", e);
                println!("DID invalid");
            }
        },
        Commands::PolicyId { label_id, public_key } => {
            let key = hex::decode(public_key.trim_start_matches("0x")).context("public key must be hex")?;
            println!("{}", derive_policy_id(&label_id, &key)?);
        }
        Commands::Config { path } => {
            let config = RegistryConfig::load(path.as_deref())?;
            print_json(&config)?;
        }
    }

    Ok(())
}
