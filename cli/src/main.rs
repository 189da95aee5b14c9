mod commands;
mod terminal;

use commands::{providers, scan, CommandLine, Commands};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.quiet);
    print::banner(commands.quiet);

    match commands.command {
        Commands::Scan(args) => {
            print::header("origin scan", commands.quiet);
            scan::run(args, commands.quiet).await
        }
        Commands::Providers { waf_file } => {
            print::header("provider database", commands.quiet);
            providers::run(waf_file)
        }
    }
}
