//! Command-line interface for the fragment composer.
//!
//! Reads a JSON composition input (one host fragment and its extension
//! bundles), merges the fragments and writes the generated driver to
//! `{output_dir}/{name}.rs`. Exits with status 2 when the output file cannot
//! be opened and 1 on any other failure.

#[cfg(feature = "cli")]
mod real {
    use anyhow::Context;
    use clap::Parser;
    use grafter_gen::{GenerateError, generate};
    use std::path::PathBuf;
    use std::process::ExitCode;

    #[derive(Parser)]
    #[command(about = "Compose host and extension parser fragments into one engine")]
    struct Args {
        /// Path to the JSON composition input.
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Path to the output directory.
        #[arg(short = 'o', long)]
        output_dir: PathBuf,

        /// Prefix used to construct the output file name and parser type.
        #[arg(short = 'n', long)]
        name: String,

        /// Enable debug logging (off by default).
        #[arg(short = 'd', long)]
        debug: bool,
    }

    fn run(args: &Args) -> anyhow::Result<PathBuf> {
        generate(&args.input, &args.output_dir, &args.name)
            .with_context(|| format!("composing {}", args.input.display()))
    }

    pub fn main() -> ExitCode {
        let args = Args::parse();
        env_logger::Builder::from_default_env()
            .filter_level(if args.debug {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            })
            .init();

        match run(&args) {
            Ok(path) => {
                log::info!("generated {}", path.display());
                ExitCode::SUCCESS
            }
            Err(err) => {
                log::error!("{:#}", err);
                ExitCode::from(err.downcast_ref::<GenerateError>().map_or(1, GenerateError::exit_code))
            }
        }
    }
}

#[cfg(feature = "cli")]
fn main() -> std::process::ExitCode {
    real::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("grafter disabled (compiled without `cli` feature)");
}
