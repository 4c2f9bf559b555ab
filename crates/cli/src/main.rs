mod serve;

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use boletera_bsale::BsaleClient;
use boletera_config::Settings;
use boletera_evo::EvoClient;
use boletera_ledger::SqliteLedger;
use boletera_recon::{Orchestrator, PollReport, RunMode, SyncError, VariantMap};

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "boletera")]
#[command(about = "Syncs gym sales into the billing service, exactly once per sale")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server: sale webhook plus manual sync endpoint
    Serve,
    /// One-shot poll of today's paid sales across all branches
    Sync {
        /// test simulates without emitting; prod emits for real
        #[arg(long, value_enum, default_value_t = Mode::Test)]
        modo: Mode,
    },
    /// List ledger keys claimed but never finished (crash leftovers)
    Pending,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Test,
    Prod,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Mode::Test => "test",
            Mode::Prod => "prod",
        })
    }
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Test => RunMode::Test,
            Mode::Prod => RunMode::Prod,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run(settings),
        Commands::Sync { modo } => run_sync(&settings, modo.into()),
        Commands::Pending => run_pending(&settings),
    };
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run_sync(settings: &Settings, mode: RunMode) -> Result<u8, SyncError> {
    let evo = EvoClient::new(
        &settings.evo_base_v1,
        &settings.evo_base_v2,
        &settings.evo_user,
        &settings.evo_pass,
    )?;
    let bsale = BsaleClient::new(&settings.bsale_base, &settings.bsale_token)?;
    let mut ledger = SqliteLedger::open(&settings.ledger_path)?;
    let mut variants =
        VariantMap::load(&settings.variant_map_path, settings.sync.generic_variant_id)?;

    let report = Orchestrator::new(&evo, &bsale, &mut ledger, &mut variants, &settings.sync)
        .run_poll(mode)?;
    print_report(&report);
    if report.failed() > 0 {
        return Ok(EXIT_ERROR);
    }
    Ok(EXIT_SUCCESS)
}

fn print_report(report: &PollReport) {
    println!(
        "sync {} {}: {} emitted, {} simulated, {} duplicated, {} failed",
        report.day,
        report.mode.as_str(),
        report.emitted(),
        report.simulated(),
        report.duplicated(),
        report.failed()
    );
    for branch in &report.branches {
        match &branch.error {
            Some(e) => println!("  branch {}: fetch failed: {e}", branch.branch),
            None => println!(
                "  branch {}: {} fetched, {} off-day",
                branch.branch, branch.fetched, branch.filtered
            ),
        }
        for sale in &branch.sales {
            println!("    {} -> {:?}", sale.sale_key, sale.outcome);
        }
    }
}

fn run_pending(settings: &Settings) -> Result<u8, SyncError> {
    let ledger = SqliteLedger::open(&settings.ledger_path)?;
    let stuck = ledger.stuck_pending()?;
    if stuck.is_empty() {
        println!("no pending keys");
        return Ok(EXIT_SUCCESS);
    }
    for key in &stuck {
        println!("{key}");
    }
    // Pending keys need a human decision; flag them in the exit code.
    Ok(EXIT_ERROR)
}
