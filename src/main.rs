use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use gdpx::core::country::{ListQuery, SortMode};
use gdpx::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for gdpx::AppCommand {
    fn from(cmd: Commands) -> gdpx::AppCommand {
        match cmd {
            Commands::Serve => gdpx::AppCommand::Serve,
            Commands::Refresh => gdpx::AppCommand::Refresh,
            Commands::List {
                region,
                currency,
                sort,
            } => gdpx::AppCommand::List(ListQuery {
                region,
                currency,
                sort,
            }),
            Commands::Show { name } => gdpx::AppCommand::Show(name),
            Commands::Delete { name } => gdpx::AppCommand::Delete(name),
            Commands::Status => gdpx::AppCommand::Status,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP API
    Serve,
    /// Fetch countries and exchange rates and store the merged records
    Refresh,
    /// List stored countries
    List {
        /// Only countries in this region
        #[arg(long)]
        region: Option<String>,
        /// Only countries using this currency code
        #[arg(long)]
        currency: Option<String>,
        /// gdp_desc or gdp_asc; name order when omitted
        #[arg(long, default_value_t = SortMode::Natural, hide_default_value = true)]
        sort: SortMode,
    },
    /// Show one country
    Show { name: String },
    /// Delete one country
    Delete { name: String },
    /// Show the stored country count and last refresh time
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => gdpx::cli::setup::setup_at_path(path),
            None => gdpx::cli::setup::setup(),
        },
        Some(cmd) => gdpx::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
