use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use v2fhir_core::constants::CONFIG_ENV_VAR;
use v2fhir_core::{resolve_config_path, MapperConfig, MessageMapper, ProfileSelection};

#[derive(Parser)]
#[command(name = "v2fhir")]
#[command(about = "Map HL7v2 ADT/ORM messages to FHIR resources")]
struct Cli {
    /// Config file (defaults to $V2FHIR_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map one message file and print the resources
    Map {
        /// Message file
        file: PathBuf,
        /// Profile name, or `auto` to route on the message type
        #[arg(long)]
        profile: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// List the available mapping profiles
    Profiles,
    /// Print a mapping profile as YAML
    ShowProfile {
        /// Profile name
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

/// Entry point for the `v2fhir` command.
///
/// Configuration is resolved once, before any message is read:
/// `--config`, then `V2FHIR_CONFIG`, then the built-in defaults. Mapping
/// events are logged through `tracing`; set `RUST_LOG` to change the level.
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("v2fhir=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Map {
            file,
            profile,
            format,
        } => {
            let config = match profile {
                Some(profile) => config.with_selection(ProfileSelection::parse(&profile))?,
                None => config,
            };
            map_file(config, &file, format)?;
        }
        Commands::Profiles => {
            for profile in config.profiles() {
                match &profile.description {
                    Some(description) => println!("{}\t{}", profile.name, description),
                    None => println!("{}", profile.name),
                }
            }
        }
        Commands::ShowProfile { name } => {
            let Some(profile) = config.profile(&name) else {
                bail!("unknown mapping profile '{name}'");
            };
            print!("{}", profile.to_yaml()?);
        }
    }

    Ok(())
}

fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<MapperConfig> {
    match resolve_config_path(explicit, std::env::var(CONFIG_ENV_VAR).ok()) {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading mapper config");
            MapperConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(MapperConfig::with_defaults()?),
    }
}

fn map_file(config: MapperConfig, file: &Path, format: Format) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read message {}", file.display()))?;

    let mapper = MessageMapper::with_tracing(config);
    let mapped = mapper
        .map_text(&text)
        .with_context(|| format!("failed to map {}", file.display()))?;

    tracing::info!(
        profile = %mapped.profile,
        resources = mapped.resources().len(),
        "mapped message"
    );

    for resource in mapped.resources() {
        match format {
            Format::Json => println!("{}", fhir::render_json(&resource)?),
            Format::Yaml => print!("---\n{}", fhir::render_yaml(&resource)?),
        }
    }
    Ok(())
}
