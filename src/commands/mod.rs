use std::{fmt::Display, io::IsTerminal, path::PathBuf, sync::Arc};

use clap::{command, Parser, Subcommand, ValueEnum};
use eyre::{eyre, Context};
use tracing::level_filters::LevelFilter;

use relaylog::{
    config::{ConfigManager, LocalConfigManager},
    http,
    logging::{self, adapter, latest_log_file, Logger, WebhookChannel},
};

mod archive;
mod emit;
mod files;
mod info;
mod read;
mod session;

#[derive(Subcommand, Debug)]
pub enum RelaylogCmd {
    Emit(emit::Cmd),

    Session(session::Cmd),

    Files(files::Cmd),

    Archive(archive::Cmd),

    Read(read::Cmd),

    Info(info::Cmd),
}

impl Display for RelaylogCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelaylogCmd::Emit(cmd) => write!(f, "emit {}", cmd.level),
            RelaylogCmd::Session(_cmd) => write!(f, "session"),
            RelaylogCmd::Files(cmd) => write!(f, "files {:?}", cmd.selector),
            RelaylogCmd::Archive(cmd) => write!(
                f,
                "archive{}",
                if cmd.inactive { " --inactive" } else { "" }
            ),
            RelaylogCmd::Read(_cmd) => write!(f, "read"),
            RelaylogCmd::Info(_cmd) => write!(f, "info"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Parser)]
#[command(version, long_version = "")]
#[command(about = "Write leveled log records to session files, the terminal and chat webhooks.", long_about = None, disable_help_subcommand = true)]
pub struct Relaylog {
    #[arg(
        global = true,
        long,
        help = "Directory holding the session log files. Defaults to RELAYLOG_DIR or the user data directory.",
        display_order = 0
    )]
    pub log_dir: Option<PathBuf>,

    #[arg(
        global = true,
        long,
        help = "Append to this file instead of the most recent session file.",
        display_order = 0
    )]
    pub file: Option<PathBuf>,

    #[arg(global = true, long, value_enum, default_value_t = ColorChoice::Auto, display_order = 1)]
    pub color: ColorChoice,

    #[arg(
        global = true,
        long,
        short = 'q',
        help = "Don't echo records to the terminal.",
        display_order = 1
    )]
    pub quiet: bool,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Write verbose messages to stderr for debugging.",
        display_order = 999
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: RelaylogCmd,
}

impl Relaylog {
    fn log_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            5_u8..=u8::MAX => LevelFilter::TRACE,
        }
    }

    fn use_ansi(&self) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stdout().is_terminal(),
        }
    }

    /// Diagnostics about relaylog itself go to stderr and never into the
    /// log files.
    fn setup_diagnostics(&self) -> eyre::Result<()> {
        let filter = self.log_filter();
        if filter == LevelFilter::OFF {
            return Ok(());
        }

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| eyre!("Failed installing diagnostics subscriber: {}", err))
    }

    fn build_logger(&self, config: &impl ConfigManager) -> eyre::Result<Arc<Logger>> {
        let log_dir = config.get_log_dir()?;
        let initial_file = match &self.file {
            Some(file) => Some(file.clone()),
            None => latest_log_file(&log_dir)
                .with_context(|| format!("Failed scanning {}", log_dir.display()))?,
        };

        let mut builder = Logger::builder()
            .with_log_dir(log_dir.clone())
            .with_initial_file(initial_file)
            .with_ansi(self.use_ansi())
            .with_report_by_default(config.report_by_default()?);

        if self.quiet {
            builder = builder.with_null_console();
        }

        if let Some(routes) = config.get_routes() {
            let certs = match config.get_ca_bundle() {
                Some(path) => Some(
                    http::load_certificates_from_pem(&path)
                        .with_context(|| format!("Failed reading CA bundle {}", path.display()))?,
                ),
                None => None,
            };

            let client = http::Builder::new()
                .with_custom_certs(certs)
                .build_https()
                .context("Failed creating webhook client")?;

            builder = builder.with_remote(Arc::new(WebhookChannel::new(client)), routes);
        }

        let logger = logging::configure(builder).context("Failed opening the log file")?;

        // Records from dependencies using the `log` facade land in the same files.
        if let Err(err) = adapter::install(log::LevelFilter::Warn) {
            tracing::debug!(target: "relaylog", "external log adapter not installed: {}", err);
        }

        Ok(logger)
    }

    pub fn run(self) -> eyre::Result<()> {
        self.setup_diagnostics()?;

        let config = LocalConfigManager::new().with_log_dir(self.log_dir.clone());
        let logger = self.build_logger(&config)?;

        tracing::info!(target: "relaylog", "running command {}", &self.cmd);
        tracing::trace!(target: "relaylog", "active file: {}", logger.current_file().display());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let result = runtime.block_on(self.invoke_sub_command(logger, &config));

        if let Err(msg) = &result {
            tracing::error!(target: "relaylog", "failed running command {}, error={} cause={}", &self.cmd, msg, msg.root_cause());
        }

        logging::shutdown();
        result
    }

    async fn invoke_sub_command<T>(&self, logger: Arc<Logger>, config: &T) -> eyre::Result<()>
    where
        T: ConfigManager,
    {
        match &self.cmd {
            RelaylogCmd::Emit(emit) => emit.run(&logger),
            RelaylogCmd::Session(session) => session.run(&logger),
            RelaylogCmd::Files(files) => files.run(&logger),
            RelaylogCmd::Archive(archive) => archive.run(&logger).await,
            RelaylogCmd::Read(read) => read.run(&logger, self.use_ansi()).await,
            RelaylogCmd::Info(info) => info.run(&logger, config),
        }
    }
}
