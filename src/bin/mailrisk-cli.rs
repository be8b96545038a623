#[path = "mailrisk-cli/args.rs"]
mod args;
#[path = "mailrisk-cli/output.rs"]
mod output;
#[path = "mailrisk-cli/traps.rs"]
mod traps;

use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use mailrisk::{
    BatchResult, CacheStore, MemoryCache, RequestError, ValidationOptions, ValidationRequest, Validator,
    ValidatorConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands, LogFormat};

// codes de sortie : 0 OK, 2 invalids, 1 fatal, 3 débit dépassé
const EXIT_INVALID: i32 = 2;
const EXIT_RATE_LIMITED: i32 = 3;

#[tokio::main]
async fn main() -> Result<()> {
    // un .env absent n'est pas une erreur
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();
    init_tracing(cli.log_format);

    let config = ValidatorConfig::load(cli.config.as_deref()).context("load configuration")?;

    let emails = match &cli.cmd {
        Commands::Traps { action } => return traps::run(action, &config, &cli),
        Commands::Validate { email } => vec![email.clone()],
        Commands::Batch { file, stdin } => read_emails(file.as_deref(), *stdin)?,
    };
    if emails.is_empty() {
        bail!("no addresses to validate");
    }

    let cache = build_cache(&config).await?;
    let max_batch = config.pipeline.max_batch;
    let validator = Validator::builder()
        .config(config)
        .cache(cache)
        .build()
        .context("build validator")?;

    let options = ValidationOptions {
        deep: !cli.shallow,
        use_cache: !cli.no_cache,
        ..validator.default_options()
    };

    let mut results = Vec::with_capacity(emails.len());
    for chunk in emails.chunks(max_batch) {
        let request = ValidationRequest::new(chunk.to_vec(), options)?;
        match validator.submit(&cli.client_key, cli.tier, request).await {
            Ok(batch) => results.extend(batch.results),
            Err(err @ RequestError::RateLimited { .. }) => {
                eprintln!("{err}");
                std::process::exit(EXIT_RATE_LIMITED);
            }
            Err(err) => return Err(err.into()),
        }
    }

    let batch = BatchResult::new(results);
    info!(
        total = batch.summary.total,
        valid = batch.summary.valid,
        errors = batch.summary.errors,
        "run finished"
    );
    output::write_report(&batch, &cli)?;

    if batch.summary.invalid > 0 {
        std::process::exit(EXIT_INVALID);
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Une adresse par ligne; lignes vides et commentaires `#` ignorés.
fn read_emails(file: Option<&std::path::Path>, stdin: bool) -> Result<Vec<String>> {
    let lines: Vec<String> = match (file, stdin) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        (None, true) => io::stdin()
            .lock()
            .lines()
            .collect::<Result<_, _>>()
            .context("read stdin")?,
        (None, false) => bail!("batch needs --file PATH or --stdin"),
    };
    Ok(lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect())
}

#[cfg(feature = "with-redis")]
async fn build_cache(config: &ValidatorConfig) -> Result<Arc<dyn CacheStore>> {
    if let Some(url) = &config.cache.redis_url {
        let cache = mailrisk::RedisCache::connect(url, config.cache.key_prefix.clone())
            .await
            .context("connect to Redis")?;
        info!("using Redis cache");
        return Ok(Arc::new(cache));
    }
    Ok(Arc::new(MemoryCache::new()))
}

#[cfg(not(feature = "with-redis"))]
async fn build_cache(config: &ValidatorConfig) -> Result<Arc<dyn CacheStore>> {
    if config.cache.redis_url.is_some() {
        tracing::warn!("redis_url is set but this build lacks the 'with-redis' feature, using memory cache");
    }
    Ok(Arc::new(MemoryCache::new()))
}
