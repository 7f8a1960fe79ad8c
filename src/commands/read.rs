use std::path::PathBuf;

use clap::Args;
use eyre::Context;

use relaylog::{
    logging::{parser::parse_records, Config, DefaultFormatter, LogFormatter, Logger},
    utils::RECORD_TIME_FORMAT,
};

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(index = 1, help = "Log file to print. Defaults to the active one.")]
    pub path: Option<PathBuf>,

    #[arg(long, short, help = "Only print records of this level id.")]
    pub level: Option<String>,
}

impl Cmd {
    pub async fn run(&self, logger: &Logger, use_ansi: bool) -> eyre::Result<()> {
        let path = self.path.clone().unwrap_or_else(|| logger.current_file());
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed reading {}", path.display()))?;

        let registry = logger.registry();
        let wanted = self.level.as_deref().map(|id| registry.describe(id).code);
        let formatter = DefaultFormatter::new(Config {
            use_ansi,
            ..Config::new()
        });

        for record in parse_records(&text, registry, RECORD_TIME_FORMAT) {
            if wanted.is_some_and(|code| code != record.level.code) {
                continue;
            }

            match record.to_event() {
                Some(event) => println!("{}", formatter.render(&event).console),
                None => {
                    tracing::debug!(target: "relaylog", "record without a usable timestamp: {}", record.title);
                }
            }
        }

        Ok(())
    }
}
