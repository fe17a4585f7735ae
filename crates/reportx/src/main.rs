#![allow(unused)]

use crate::prelude::{println, *};
use clap::Parser;

mod batch;
mod error;
mod input;
mod order;
mod prelude;
mod sections;
mod tree;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Recover reading order, LETTER/MD&A boundaries and heading trees from annual-report text fragments"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML file overriding the default thresholds
    #[clap(long, env = "REPORTX_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Retry sections that were not found with relaxed thresholds
    #[clap(long, env = "REPORTX_RETRY_RELAXED", global = true, default_value = "false")]
    retry_relaxed: bool,

    /// Whether to display additional information.
    #[clap(long, env = "REPORTX_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Print lines in reconstructed reading order
    Order(crate::order::Options),

    /// Detect the LETTER and MD&A sections
    Sections(crate::sections::Options),

    /// Print the heading hierarchy of a document or section
    Tree(crate::tree::Options),

    /// Print the full structuring result as JSON
    Structure {
        /// Path to the input document (JSON)
        input: std::path::PathBuf,
    },

    /// Structure every document in a directory
    Batch(crate::batch::Options),

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();

    let level = if app.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = crate::input::load_config(app.global.config.as_deref(), app.global.retry_relaxed)?;

    match app.command {
        SubCommands::Order(options) => crate::order::run(options, &config),
        SubCommands::Sections(options) => crate::sections::run(options, &config),
        SubCommands::Tree(options) => crate::tree::run(options, &config),
        SubCommands::Structure { input } => {
            let doc = crate::input::structure_file(&input, &config)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
        SubCommands::Batch(options) => crate::batch::run(options, &config, app.global.verbose),
        SubCommands::Config => {
            let toml = config.to_toml_string().map_err(|e| eyre!(e))?;
            println!("{}", toml.trim_end());
            Ok(())
        }
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
