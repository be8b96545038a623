use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mailrisk::Tier;

#[derive(Parser)]
#[command(name = "mailrisk-cli", version, about = "Validation d'e-mails avec score de risque")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// fichier de configuration TOML
    #[arg(long, global = true, env = "MAILRISK_CONFIG")]
    pub config: Option<PathBuf>,

    /// format: human|json|ndjson|csv
    #[arg(long, global = true, value_enum, default_value_t = Format::Human)]
    pub format: Format,

    /// write report to file (atomic replace)
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// pas de sonde SMTP ni de détection catch-all
    #[arg(long, global = true)]
    pub shallow: bool,

    /// ignore les résultats en cache (ils sont quand même rafraîchis)
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// palier de débit appliqué à la requête
    #[arg(long, global = true, default_value = "enterprise", value_parser = parse_tier)]
    pub tier: Tier,

    /// identifiant client pour le limiteur de débit
    #[arg(long, global = true, default_value = "cli")]
    pub client_key: String,

    /// logs sur stderr: text|json
    #[arg(long, global = true, value_enum, env = "MAILRISK_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// valide une seule adresse
    Validate { email: String },
    /// valide une liste d'adresses (une par ligne)
    Batch {
        /// lit les adresses depuis ce fichier
        #[arg(long, conflicts_with = "stdin")]
        file: Option<PathBuf>,
        /// lit les adresses depuis stdin
        #[arg(long)]
        stdin: bool,
    },
    /// gère les motifs de spam traps
    Traps {
        #[command(subcommand)]
        action: TrapAction,
    },
}

#[derive(Subcommand)]
pub enum TrapAction {
    List,
    Add { category: String, pattern: String },
    Remove { category: String, pattern: String },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
    Ndjson,
    Csv,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }
}

fn parse_tier(raw: &str) -> Result<Tier, String> {
    raw.parse()
}
