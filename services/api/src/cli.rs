use crate::demo::{run_demo, DemoArgs};
use crate::infra::build_service;
use crate::server;
use call_queue::config::AppConfig;
use call_queue::error::AppError;
use call_queue::queue::{write_csv, CallQueueError, ListParams, QueueView};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Call Queue",
    about = "Run and inspect the loan applicant call queue from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect or maintain the configured call list
    Calls {
        #[command(subcommand)]
        command: CallsCommand,
    },
    /// Seed an in-memory queue and walk through a morning of operator actions
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CallsCommand {
    /// Print the ranked call list
    List(FilterArgs),
    /// Print queue totals and the alert level
    Summary,
    /// Write the ranked call list as CSV
    Export(ExportArgs),
    /// Delete completed and removed entries older than the retention window
    Purge(PurgeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// List type (new_application, pre_approval, general, paid_client, all)
    #[arg(long = "type")]
    list_type: Option<String>,
    /// Priority (urgent, high, normal, low, all)
    #[arg(long)]
    priority: Option<String>,
    /// Agent id, `unassigned`, or `all`
    #[arg(long)]
    agent: Option<String>,
    /// Match against name, loan reference, or email
    #[arg(long)]
    search: Option<String>,
}

impl From<FilterArgs> for ListParams {
    fn from(args: FilterArgs) -> Self {
        ListParams {
            list_type: args.list_type,
            priority: args.priority,
            agent: args.agent,
            search: args.search,
        }
    }
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Destination file (defaults to stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PurgeArgs {
    /// Retention window in days (defaults to APP_RETENTION_DAYS)
    #[arg(long)]
    days: Option<u32>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Calls { command } => run_calls(command),
        Command::Demo(args) => run_demo(args),
    }
}

fn run_calls(command: CallsCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config.store)?;

    match command {
        CallsCommand::List(args) => {
            let filter = ListParams::from(args)
                .into_filter()
                .map_err(CallQueueError::from)?;
            let view = service.list(&filter)?;
            render_view(&view);
        }
        CallsCommand::Summary => {
            let summary = service.summary()?;
            println!(
                "{} active | {} new applications | {} urgent | {} due | {} unassigned",
                summary.total,
                summary.new_applications,
                summary.urgent,
                summary.due,
                summary.unassigned
            );
            println!("Alert level: {:?}", summary.alert_level);
        }
        CallsCommand::Export(args) => {
            let filter = ListParams::from(args.filter)
                .into_filter()
                .map_err(CallQueueError::from)?;
            let view = service.list(&filter)?;
            match args.output {
                Some(path) => {
                    write_csv(&view, BufWriter::new(File::create(&path)?))?;
                    println!("Wrote {} entries to {}", view.entries.len(), path.display());
                }
                None => write_csv(&view, io::stdout().lock())?,
            }
        }
        CallsCommand::Purge(args) => {
            let days = args.days.unwrap_or(config.retention.retired_after_days);
            let purged = service.purge_retired(days)?;
            println!("Purged {purged} retired entries older than {days} days");
        }
    }

    Ok(())
}

pub(crate) fn render_view(view: &QueueView) {
    println!(
        "Call list as of {} ({} entries, {} due)",
        view.generated_at.format("%Y-%m-%d %H:%M UTC"),
        view.counters.total,
        view.counters.due
    );
    for (index, row) in view.entries.iter().enumerate() {
        let name = row
            .subject
            .as_ref()
            .map(|subject| format!("{} ({})", subject.full_name(), subject.reference))
            .unwrap_or_else(|| format!("subject {}", row.entry.subject_id));
        println!(
            "{:>3}. {:<34} {:<18} {:<7} {:<10} attempts {}/{}{}",
            index + 1,
            name,
            row.type_display,
            row.entry.priority.label(),
            row.callback_status.label(),
            row.entry.call_attempts,
            row.entry.max_attempts,
            row.agent_name
                .as_deref()
                .map(|agent| format!(" -> {agent}"))
                .unwrap_or_default()
        );
    }
}
