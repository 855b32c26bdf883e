pub mod commands;

use clap::{Parser, Subcommand};
use illustra_core::domain::user::UserId;
use std::process::ExitCode;

use crate::commands::access::AccessAction;

#[derive(Debug, Parser)]
#[command(
    name = "illustra",
    about = "Illustra operator CLI",
    long_about = "Operate the illustration intake bot: readiness checks, migrations, config inspection, and access ledger maintenance.",
    after_help = "Examples:\n  illustra doctor --json\n  illustra config\n  illustra access pending\n  illustra access add-user 123456789"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, bot token readiness, ledger files, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect or change who may use the bot")]
    Access {
        #[command(subcommand)]
        action: AccessCommand,
    },
}

#[derive(Debug, Subcommand)]
enum AccessCommand {
    #[command(about = "Show admins and authorized users")]
    List,
    #[command(about = "Show access requests waiting for an admin decision")]
    Pending,
    #[command(about = "Authorize a user and clear their pending request")]
    AddUser { user_id: i64 },
    #[command(about = "Revoke a user's authorization")]
    RemoveUser { user_id: i64 },
    #[command(about = "Grant admin rights to a user")]
    AddAdmin { user_id: i64 },
}

impl From<AccessCommand> for AccessAction {
    fn from(command: AccessCommand) -> Self {
        match command {
            AccessCommand::List => AccessAction::List,
            AccessCommand::Pending => AccessAction::Pending,
            AccessCommand::AddUser { user_id } => AccessAction::AddUser(UserId(user_id)),
            AccessCommand::RemoveUser { user_id } => AccessAction::RemoveUser(UserId(user_id)),
            AccessCommand::AddAdmin { user_id } => AccessAction::AddAdmin(UserId(user_id)),
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Access { action } => commands::access::run(action.into()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
