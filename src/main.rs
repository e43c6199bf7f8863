mod cli;

use motionphoto::{
    config,
    extract::{self, ExtractOptions, ExtractOutcome},
    inspect,
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "motionphoto=trace,motionphoto_media=trace".to_string()
        } else {
            "motionphoto=info,motionphoto_media=info".to_string()
        }
    });

    // stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            input,
            output,
            payload_only,
            force,
            recursive,
        } => run_extract(
            &input,
            output,
            cli.config.as_deref(),
            payload_only,
            force,
            recursive,
        ),
        Commands::Inspect { file, json } => inspect_file(&file, cli.config.as_deref(), json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("motionphoto {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_extract(
    input: &Path,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
    payload_only: bool,
    force: bool,
    recursive: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let options = ExtractOptions::from_config(&config, payload_only, force);

    if !input.exists() {
        anyhow::bail!("Input does not exist: {:?}", input);
    }

    if input.is_dir() {
        if output.is_some() {
            anyhow::bail!("--output cannot be used with a directory input");
        }
        let outcomes = extract::extract_dir(input, recursive, &options, &config)?;
        return report_batch(&outcomes);
    }

    let output =
        output.unwrap_or_else(|| extract::default_output_path(input, &config.extract.output_suffix));

    match extract::extract_file(input, &output, &options, &config)? {
        ExtractOutcome::Written {
            output, location, ..
        } => {
            println!(
                "{} -> {} ({} video, {} bytes)",
                input.display(),
                output.display(),
                location.kind,
                location.len()
            );
            Ok(())
        }
        ExtractOutcome::SkippedExisting { output, .. } => anyhow::bail!(
            "Output already exists: {:?} (use --force to overwrite)",
            output
        ),
        ExtractOutcome::NoVideo { .. } => anyhow::bail!("No embedded video found in {:?}", input),
        ExtractOutcome::Failed { error, .. } => anyhow::bail!(error),
    }
}

fn report_batch(outcomes: &[ExtractOutcome]) -> Result<()> {
    let mut written = 0;
    let mut failed = 0;

    for outcome in outcomes {
        match outcome {
            ExtractOutcome::Written {
                input,
                output,
                location,
            } => {
                written += 1;
                println!(
                    "{} -> {} ({} video, {} bytes)",
                    input.display(),
                    output.display(),
                    location.kind,
                    location.len()
                );
            }
            ExtractOutcome::NoVideo { input } => {
                println!("{}: no embedded video", input.display());
            }
            ExtractOutcome::SkippedExisting { input, output } => {
                println!("{}: {} exists, skipped", input.display(), output.display());
            }
            ExtractOutcome::Failed { input, error } => {
                failed += 1;
                println!("{}: {}", input.display(), error);
            }
        }
    }

    println!(
        "\n{} files, {} extracted, {} failed",
        outcomes.len(),
        written,
        failed
    );

    if failed > 0 {
        anyhow::bail!("{} files could not be processed", failed);
    }
    Ok(())
}

fn inspect_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let report = inspect::inspect_file(file, &config)?;

    if json {
        let json_str = serde_json::to_string_pretty(&report)?;
        println!("{}", json_str);
    } else {
        report.print_text();
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Extensions: {}", config.extract.extensions.join(", "));
    if config.extract.required_major_brand.is_empty() {
        println!("  Required major brand: (any)");
    } else {
        println!(
            "  Required major brand: {}",
            config.extract.required_major_brand
        );
    }
    println!("  Output suffix: {}", config.extract.output_suffix);
    println!("  Overwrite: {}", config.extract.overwrite);
    println!("  Payload only: {}", config.extract.payload_only);
    println!(
        "  Max vendor box size: {} bytes",
        config.scan.max_vendor_box_size
    );

    Ok(())
}
