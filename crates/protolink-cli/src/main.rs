//! Protolink CLI
//!
//! Command-line interface for:
//! - Linking descriptor sets and reporting how well each file resolved
//! - Listing the messages, enums and services the linked files declare

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use protolink_core::{
    to_records, LinkConfig, LinkOutcome, LinkReportV1, Linker, MergedFiles, TypeKind, TypeSet,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "protolink")]
#[command(author, version, about = "Protolink: link Protobuf descriptor sets")]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link descriptor sets and summarize resolved/partial/unresolved files.
    Link {
        #[command(flatten)]
        input: InputArgs,
        /// Write the JSON link report here.
        #[arg(long)]
        json: Option<PathBuf>,
        /// Fail unless every file links completely.
        #[arg(long)]
        strict: bool,
    },

    /// List types declared by the linked files.
    Types {
        #[command(flatten)]
        input: InputArgs,
        /// List services instead of messages and enums.
        #[arg(long)]
        services: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Descriptor set files (`protoc --descriptor_set_out`).
    descriptor_sets: Vec<PathBuf>,
    /// Resource roots containing `known_type_providers` lists.
    #[arg(long = "resources")]
    resource_roots: Vec<PathBuf>,
    /// Skip files whose package contains the standard package fragment.
    #[arg(long)]
    skip_standard: bool,
    /// JSON config file; command-line values are added on top of it.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl InputArgs {
    fn to_config(&self) -> Result<LinkConfig> {
        let mut config = match &self.config {
            Some(path) => LinkConfig::from_json_file(path)?,
            None => LinkConfig::default(),
        };
        config.descriptor_sets.extend(self.descriptor_sets.iter().cloned());
        config.resource_roots.extend(self.resource_roots.iter().cloned());
        config.skip_standard |= self.skip_standard;
        if config.descriptor_sets.is_empty() && config.resource_roots.is_empty() {
            return Err(anyhow!(
                "no input: pass descriptor set files or --resources roots"
            ));
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Link {
            input,
            json,
            strict,
        } => cmd_link(&input, json.as_ref(), strict),
        Commands::Types { input, services } => cmd_types(&input, services),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn link(config: &LinkConfig) -> Result<LinkOutcome> {
    let reader = config.reader();
    let mut files = MergedFiles::new();
    files.extend(
        reader
            .read_all(&config.descriptor_sets)
            .context("failed to read descriptor sets")?,
    );
    if !config.resource_roots.is_empty() {
        files.extend(
            config
                .resource_roots()
                .load(&reader)
                .context("failed to load known type providers")?,
        );
    }

    let records = to_records(files.into_files())?;
    tracing::debug!(files = records.len(), "linking descriptor set files");
    let mut linker = Linker::new(records)?;
    linker.resolve()?;
    Ok(linker.into_outcome())
}

fn cmd_link(input: &InputArgs, json_out: Option<&PathBuf>, strict: bool) -> Result<()> {
    let config = input.to_config()?;
    let strict = strict || config.strict;
    let outcome = link(&config)?;
    let report = LinkReportV1::from_outcome(&outcome);

    println!("{}", "Linked descriptor sets".green().bold());
    println!("  files:              {}", report.stats.files);
    println!("  resolved:           {}", report.stats.resolved.to_string().green());
    println!(
        "  partially resolved: {}",
        paint_count(report.stats.partially_resolved)
    );
    println!("  unresolved:         {}", paint_count(report.stats.unresolved));

    for partial in &report.partially_resolved {
        println!(
            "  {} {} (missing: {})",
            "~".yellow(),
            partial.name,
            partial.missing.join(", ")
        );
    }
    for name in &report.unresolved {
        println!("  {} {}", "✗".red(), name);
    }

    if let Some(path) = json_out {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, report.to_json_pretty()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("  {} {}", "→".cyan(), path.display());
    }

    if strict && !report.is_complete() {
        return Err(anyhow!(
            "{} file(s) could not be fully linked",
            report.stats.partially_resolved + report.stats.unresolved
        ));
    }
    Ok(())
}

fn cmd_types(input: &InputArgs, services: bool) -> Result<()> {
    let config = input.to_config()?;
    let all = link(&config)?.all();
    let types = if services {
        TypeSet::services(&all)
    } else {
        TypeSet::from_files(&all)
    };

    for declared in types.iter() {
        let kind = match declared.kind {
            TypeKind::Message => "message".blue(),
            TypeKind::Enum => "enum".magenta(),
            TypeKind::Service => "service".cyan(),
        };
        println!("{kind:>8} {}  {}", declared.name, declared.file.as_str().dimmed());
    }
    Ok(())
}

fn paint_count(count: usize) -> colored::ColoredString {
    if count == 0 {
        count.to_string().green()
    } else {
        count.to_string().yellow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_link_command() {
        let cli = Cli::try_parse_from([
            "protolink",
            "-v",
            "link",
            "main.desc",
            "test.desc",
            "--skip-standard",
            "--resources",
            "build/resources",
            "--strict",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Link { input, strict, json } => {
                assert!(strict);
                assert!(json.is_none());
                let config = input.to_config().unwrap();
                assert_eq!(
                    config.descriptor_sets,
                    vec![PathBuf::from("main.desc"), PathBuf::from("test.desc")]
                );
                assert_eq!(config.resource_roots, vec![PathBuf::from("build/resources")]);
                assert!(config.skip_standard);
            }
            Commands::Types { .. } => panic!("expected link command"),
        }
    }

    #[test]
    fn requires_some_input() {
        let cli = Cli::try_parse_from(["protolink", "types"]).unwrap();
        match cli.command {
            Commands::Types { input, .. } => assert!(input.to_config().is_err()),
            Commands::Link { .. } => panic!("expected types command"),
        }
    }
}
