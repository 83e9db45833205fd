use crate::prelude::*;
use clap::Parser;

mod analysis;
mod config;
mod datasheet;
mod error;
mod params;
mod populate;
mod prelude;
mod run;
mod workbook;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Builds OOT Impact Analysis workbooks from a Reverse Trace and a datasheet PDF"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Configuration file (TOML)
    #[clap(long, env = "AUTO_OOT_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "AUTO_OOT_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Build OOT_<UID>.xlsx from the Reverse Trace and an optional datasheet
    Run(crate::run::App),

    /// Analyze a datasheet PDF and print its parameter report
    Params(crate::params::ParamsOptions),

    /// Print the shaded header bars of a datasheet PDF
    Bars(crate::params::BarsOptions),
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();
    let config = crate::config::load(app.global.config.as_deref())?;

    match app.command {
        SubCommands::Run(sub_app) => crate::run::run(sub_app, &config, app.global),
        SubCommands::Params(options) => crate::params::run_params(options, &config, app.global),
        SubCommands::Bars(options) => crate::params::run_bars(options, &config, app.global),
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
