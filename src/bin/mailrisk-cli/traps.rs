use anyhow::{Context, Result, bail};
use mailrisk::ValidatorConfig;
use mailrisk::heuristics::SpamTrapDetector;

use crate::args::{Cli, Format, TrapAction};

pub fn run(action: &TrapAction, config: &ValidatorConfig, cli: &Cli) -> Result<()> {
    let detector = match &config.spam_trap_file {
        Some(path) => SpamTrapDetector::from_file(path).context("load spam trap patterns")?,
        None => match action {
            TrapAction::List => SpamTrapDetector::default(),
            // sans fichier, une modification serait perdue à la sortie
            _ => bail!("no spam trap file configured (set spam_trap_file or MAILRISK_SPAM_TRAP_FILE)"),
        },
    };

    match action {
        TrapAction::List => list(&detector, cli.format),
        TrapAction::Add { category, pattern } => {
            if detector.add_pattern(category, pattern)? {
                println!("added {category}: {pattern}");
            } else {
                println!("already present {category}: {pattern}");
            }
            Ok(())
        }
        TrapAction::Remove { category, pattern } => {
            if detector.remove_pattern(category, pattern)? {
                println!("removed {category}: {pattern}");
            } else {
                println!("not found {category}: {pattern}");
            }
            Ok(())
        }
    }
}

fn list(detector: &SpamTrapDetector, format: Format) -> Result<()> {
    let patterns = detector.patterns();
    match format {
        Format::Json | Format::Ndjson => println!("{}", serde_json::to_string_pretty(&patterns)?),
        Format::Human | Format::Csv => {
            for (category, sources) in &patterns {
                println!("{category}:");
                for source in sources {
                    println!("    {source}");
                }
            }
        }
    }
    Ok(())
}
