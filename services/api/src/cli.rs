use crate::server;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use shepherd::error::AppError;
use shepherd::scheduler::Job;

#[derive(Parser, Debug)]
#[command(
    name = "shepherd",
    about = "Run the Shepherd pastoral care service and its scheduled scans",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the job scheduler (default command)
    Serve(ServeArgs),
    /// Apply pending database migrations and exit
    Migrate,
    /// Run one scheduled job immediately and print its report as JSON
    Scan(ScanArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve HTTP only; do not start the background scheduler
    #[arg(long)]
    pub(crate) no_scheduler: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Job to run: birthdays, absences or tithe-reminders
    #[arg(value_parser = crate::infra::parse_job)]
    pub(crate) job: Job,
    /// Run as if it were this date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Migrate => server::migrate().await,
        Command::Scan(args) => server::scan(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["shepherd"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn scan_accepts_a_job_and_date() {
        let cli = Cli::try_parse_from(["shepherd", "scan", "tithe-reminders", "--today", "2025-06-13"])
            .expect("parses");
        let Some(Command::Scan(args)) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(args.job, Job::TitheReminders);
        assert_eq!(args.today, NaiveDate::from_ymd_opt(2025, 6, 13));
    }

    #[test]
    fn unknown_jobs_are_rejected() {
        assert!(Cli::try_parse_from(["shepherd", "scan", "payroll"]).is_err());
    }
}
