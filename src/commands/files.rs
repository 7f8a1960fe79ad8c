use clap::Args;

use relaylog::logging::{LogSelector, Logger};

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(
        index = 1,
        default_value = "current",
        value_name = "current|last|all",
        help = "Which log files to list."
    )]
    pub selector: LogSelector,
}

impl Cmd {
    pub fn run(&self, logger: &Logger) -> eyre::Result<()> {
        for path in logger.retrieve_log_file(self.selector)? {
            println!("{}", path.display());
        }

        Ok(())
    }
}
