//! Cardiomine: heart disease data mining CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cardiomine::cli::{Cli, Commands};
use cardiomine::pipeline::{run_analyze, run_pipeline, LoadOptions};
use cardiomine::utils::{print_banner, print_completion, print_config};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Analyze {
                input,
                infer_schema_length,
            } => {
                print_banner(env!("CARGO_PKG_VERSION"));
                run_analyze(
                    input,
                    &LoadOptions {
                        infer_schema_length: *infer_schema_length,
                    },
                )?;
                Ok(())
            }
        };
    }

    let config = cli.pipeline_config().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(
        &config.input,
        &config.report,
        &config.output_dir,
        config.folds,
        config.seed,
    );

    run_pipeline(&config)?;

    print_completion();
    Ok(())
}
