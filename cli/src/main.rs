use anyhow::{Context as _, Result};
use clap::Parser;
use std::{fs, path::PathBuf};

/// Runs a WebAssembly Script (`.wast`) file against the conformance harness.
#[derive(Parser)]
#[command(name = "wast-harness", version, about)]
struct Cli {
    /// The `.wast` script file to execute.
    #[clap(
        required = true,
        value_name = "SCRIPT_FILE",
        value_hint = clap::ValueHint::FilePath,
    )]
    wast: PathBuf,

    /// Skip `assert_exhaustion` directives instead of running them to completion.
    #[clap(long = "no-exhaustion")]
    no_exhaustion: bool,

    /// Print the final set of bound module names after a successful run.
    #[clap(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    Cli::parse().execute()
}

impl Cli {
    fn execute(self) -> Result<()> {
        let wast = fs::read_to_string(&self.wast)
            .with_context(|| format!("failed to read .wast file: {:?}", self.wast))?;
        let mut config = wasmi::Config::default();
        config.wasm_custom_page_sizes(true);
        config.wasm_wide_arithmetic(true);
        let path = self.wast.as_os_str().to_str().unwrap_or("");
        let link_state = wast_harness::run(path, &wast, self.no_exhaustion, &config)
            .map_err(|error| anyhow::anyhow!("{path}: {error}"))?;
        if self.verbose {
            let mut names: Vec<&str> = link_state.names().collect();
            names.sort_unstable();
            for name in names {
                println!("registered: {name}");
            }
        }
        Ok(())
    }
}
