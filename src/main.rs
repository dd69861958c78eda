mod commands;

use structopt::StructOpt;

fn main() -> anyhow::Result<()> {
    commands::Main::from_args().execute()
}
