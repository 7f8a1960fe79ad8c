use std::{path::PathBuf, time::Duration};

use clap::Args;
use eyre::bail;

use relaylog::{
    logging::{ArchiveError, LogSelector, Logger},
    utils::{older_than, parse_duration},
};

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(
        index = 1,
        value_name = "PATH",
        required_unless_present = "inactive",
        conflicts_with = "inactive",
        help = "Log files to upload to the webhook and delete locally."
    )]
    pub paths: Vec<PathBuf>,

    #[arg(long, help = "Archive every log file except the active one.")]
    pub inactive: bool,

    #[arg(
        long,
        requires = "inactive",
        value_parser = parse_duration,
        help = "Only archive files untouched for this long, e.g. 7d or 12h."
    )]
    pub older_than: Option<Duration>,
}

impl Cmd {
    fn targets(&self, logger: &Logger) -> eyre::Result<Vec<PathBuf>> {
        if !self.inactive {
            return Ok(self.paths.clone());
        }

        let active = logger.current_file();
        let targets = logger
            .retrieve_log_file(LogSelector::All)?
            .into_iter()
            .filter(|path| *path != active)
            .filter(|path| match self.older_than {
                Some(age) => older_than(path, age),
                None => true,
            })
            .collect();

        Ok(targets)
    }

    pub async fn run(&self, logger: &Logger) -> eyre::Result<()> {
        if logger.remote().routes().is_none() {
            bail!("No webhook configured, set RELAYLOG_LOG_WEBHOOK to archive log files");
        }

        let mut failed = 0;
        for path in self.targets(logger)? {
            match logger.archive(&path).await {
                Ok(()) => println!("archived {}", path.display()),
                Err(ArchiveError::ActiveFileProtected(path)) => {
                    eprintln!("skipped {}: it is the active log file", path.display());
                }
                Err(err) => {
                    tracing::warn!(target: "relaylog", "archiving {} failed: {:?}", path.display(), err);
                    eprintln!("failed {}: {}", path.display(), err);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            bail!("Failed archiving {} log file(s)", failed);
        }

        Ok(())
    }
}
