use clap::Args;
use eyre::Context;

use relaylog::logging::Logger;

#[derive(Args, Debug)]
pub struct Cmd {}

impl Cmd {
    pub fn run(&self, logger: &Logger) -> eyre::Result<()> {
        let handle = logger
            .new_session()
            .context("Failed starting a new log file")?;

        println!("{}", handle.path.display());
        Ok(())
    }
}
