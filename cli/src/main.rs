mod commands;
mod inventory;
mod terminal;

use commands::{CommandLine, Commands, classify, plan, probe};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);

    match commands.command {
        Commands::Plan { target, options } => {
            print::header("planning attempts");
            plan::plan(target, &options)
        }
        Commands::Classify { version, peer_type } => {
            print::header("classifying peer");
            classify::classify(&version, &peer_type)
        }
        Commands::Probe { target, options } => {
            print::header("getting ready to negotiate");
            probe::probe(target, &options).await
        }
    }
}
