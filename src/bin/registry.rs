//! Schema Registry CLI
//!
//! Derives subjects, fetches and registers schemas, and inspects framed
//! records against a Confluent-compatible registry.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use apache_avro::Schema;
use avro_registry_bridge::config::keys;
use avro_registry_bridge::{
    resolve_subject, RecordDecoder, RegistryClient, RegistryConfig, SubjectNameStrategy,
    WireEnvelope,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "avro-registry")]
#[command(about = "Work with Avro schemas in a schema registry")]
#[command(version)]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    /// Registry URL, overriding the configuration
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the subject for a topic and record
    Subject {
        #[arg(short, long)]
        topic: Option<String>,
        /// topic.name, record.name or topic.record.name
        #[arg(short, long, default_value = "topic.name")]
        strategy: String,
        /// Derive the key subject instead of the value subject
        #[arg(short, long)]
        key: bool,
        #[arg(long)]
        record_name: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
        /// Take the record identity from this schema file
        #[arg(long)]
        schema_file: Option<PathBuf>,
    },

    /// Print a schema from the registry
    Fetch {
        #[arg(short, long)]
        subject: String,
        /// Schema id
        #[arg(long, conflicts_with = "version")]
        id: Option<i32>,
        /// Subject version (latest when neither id nor version is given)
        #[arg(long)]
        version: Option<i32>,
    },

    /// Check whether a subject has any versions
    Exists {
        #[arg(short, long)]
        subject: String,
    },

    /// Register a schema file under a subject
    Register {
        #[arg(short, long)]
        subject: String,
        schema_file: PathBuf,
        /// Only report whether the schema is compatible
        #[arg(long)]
        check: bool,
    },

    /// Decode a file holding one framed record
    Inspect { file: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = RegistryConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(url) = cli.url {
        config.set(keys::REGISTRY_URL, url);
    }

    match cli.command {
        Commands::Subject {
            topic,
            strategy,
            key,
            record_name,
            namespace,
            schema_file,
        } => {
            let strategy: SubjectNameStrategy = strategy.parse().map_err(anyhow::Error::msg)?;
            let schema = schema_file.as_deref().map(read_schema).transpose()?;
            let subject = resolve_subject(
                topic.as_deref(),
                key,
                schema.as_ref(),
                record_name.as_deref(),
                namespace.as_deref(),
                strategy,
            )?;
            println!("{}", subject);
        }

        Commands::Fetch {
            subject,
            id,
            version,
        } => {
            let client = connect(&config)?;
            let schema = match (id, version) {
                (Some(id), _) => client.get_by_subject_and_id(&subject, id),
                (None, Some(version)) => client
                    .get_by_subject_and_version(&subject, version)
                    .map(|entry| entry.schema),
                (None, None) => client.get_latest_entry(&subject).map(|entry| entry.schema),
            };
            match schema {
                Some(schema) => println!("{}", serde_json::to_string_pretty(&schema)?),
                None => bail!("no schema found for subject '{}'", subject),
            }
        }

        Commands::Exists { subject } => {
            let client = connect(&config)?;
            if client.exists(&subject) {
                let versions = client.list_versions(&subject).unwrap_or_default();
                println!("✅ {} ({} versions)", subject, versions.len());
            } else {
                println!("❌ {} not found", subject);
                std::process::exit(2);
            }
        }

        Commands::Register {
            subject,
            schema_file,
            check,
        } => {
            let schema = read_schema(&schema_file)?;
            let client = connect(&config)?;
            if check {
                if client.is_compatible(&schema, &subject)? {
                    println!("✅ Compatible with the latest version of {}", subject);
                } else {
                    println!("❌ Incompatible with the latest version of {}", subject);
                    std::process::exit(1);
                }
            } else {
                let id = client.register_schema(&schema, &subject)?;
                println!("✅ Registered under {} with id {}", subject, id);
            }
        }

        Commands::Inspect { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let envelope = WireEnvelope::parse(&bytes)?;
            println!("Schema id: {}", envelope.schema_id);
            println!("Payload:   {} bytes", envelope.payload.len());

            let client = connect(&config)?;
            let value = RecordDecoder::new(&client).decode_generic(&bytes)?;
            let json = serde_json::Value::try_from(value)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

fn connect(config: &RegistryConfig) -> anyhow::Result<RegistryClient> {
    let client = RegistryClient::new();
    client
        .configure(&config.registry_options()?)
        .context("failed to connect to the schema registry")?;
    Ok(client)
}

fn read_schema(path: &Path) -> anyhow::Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Schema::parse_str(&text).with_context(|| format!("invalid Avro schema in {}", path.display()))
}
