use clap::Args;
use eyre::Context;

use relaylog::logging::Logger;

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(index = 1, help = "Level id, e.g. info, ok, notice, warning, error, critical.")]
    pub level: String,

    #[arg(index = 2)]
    pub title: String,

    #[arg(index = 3, help = "Record text. Use `-` to read it from stdin.")]
    pub message: String,

    #[arg(long, conflicts_with = "no_report", help = "Always send this record to the webhook.")]
    pub report: bool,

    #[arg(long, help = "Never send this record to the webhook.")]
    pub no_report: bool,
}

impl Cmd {
    fn report(&self) -> Option<bool> {
        match (self.report, self.no_report) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    fn read_message(&self, stdin: impl std::io::Read) -> eyre::Result<String> {
        if self.message != "-" {
            return Ok(self.message.clone());
        }

        let text = std::io::read_to_string(stdin).context("Failed reading stdin")?;
        Ok(text.trim_end().to_string())
    }

    pub fn run(&self, logger: &Logger) -> eyre::Result<()> {
        let message = self.read_message(std::io::stdin())?;

        logger
            .emit(&self.level, &self.title, &message, self.report())
            .context("Failed writing the log record")
    }
}
