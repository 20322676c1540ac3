mod difmeth;
mod popstats;
mod utils;
mod window;

use clap::{Parser, Subcommand};
use utils::UtilsArgs;
use wild::ArgsOs;

#[derive(Parser, Debug)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: MainMenu,
}

#[derive(Subcommand, Debug)]
enum MainMenu {
    #[command(
        name = "difmeth",
        about = "Per-site differential methylation p-values against \
                 population statistics"
    )]
    Difmeth {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  difmeth::DifmethArgs,
    },

    #[command(
        name = "window",
        about = "Combine per-site p-values into per-window p-values \
                 (covariance-adjusted Fisher)"
    )]
    Window {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  window::WindowArgs,
    },

    #[command(
        name = "popstats",
        about = "Build per-site population statistics (mean/std/percentiles) \
                 from raw population tables"
    )]
    Popstats {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  popstats::PopstatsArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);

    match cli.command {
        MainMenu::Difmeth { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Window { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Popstats { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
    }
    Ok(())
}
