use clap::{Args, CommandFactory};

use relaylog::{config::ConfigManager, logging::Logger};

use crate::commands::Relaylog;

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cmd {}

impl Cmd {
    pub fn run(&self, logger: &Logger, config: &impl ConfigManager) -> eyre::Result<()> {
        println!(
            "Version:        {}",
            Relaylog::command().get_version().unwrap_or("")
        );
        println!("Log Directory:  {}", logger.log_dir().display());
        println!("Active File:    {}", logger.current_file().display());

        match logger.remote().routes() {
            Some(routes) => {
                println!("Log Webhook:    {}", routes.general);
                println!("Alert Webhook:  {}", routes.alert);
            }
            None => println!("Webhooks:       disabled"),
        }

        println!("Report Default: {}", logger.report_by_default());
        println!(
            "CA Bundle:      {}",
            config
                .get_ca_bundle()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );
        Ok(())
    }
}
