use thiserror::Error;

use illustra_core::domain::request::{RequestId, RequestStatus, UnknownStatus};
use illustra_core::domain::user::UserId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandArgError {
    #[error("missing or non-numeric user id")]
    InvalidUserId,
    #[error("expected `/setstatus <id> <status>`")]
    SetStatusUsage,
    #[error(transparent)]
    InvalidStatus(#[from] UnknownStatus),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    AdminHelp,
    MyId,
    Request,
    Cancel,
    Status,
    RequestAccess,
    Pending,
    List,
    AddUser(Result<UserId, CommandArgError>),
    RemoveUser(Result<UserId, CommandArgError>),
    AddAdmin(Result<UserId, CommandArgError>),
    /// `None` lists every status.
    Lists(Result<Option<RequestStatus>, CommandArgError>),
    SetStatus(Result<(RequestId, RequestStatus), CommandArgError>),
    Unknown(String),
}

impl BotCommand {
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::AdminHelp => "adminhelp",
            Self::MyId => "myid",
            Self::Request => "request",
            Self::Cancel => "cancel",
            Self::Status => "status",
            Self::RequestAccess => "requestaccess",
            Self::Pending => "pending",
            Self::List => "list",
            Self::AddUser(_) => "adduser",
            Self::RemoveUser(_) => "removeuser",
            Self::AddAdmin(_) => "addadmin",
            Self::Lists(_) => "lists",
            Self::SetStatus(_) => "setstatus",
            Self::Unknown(name) => name,
        }
    }
}

/// Parses `/name[@bot] args`. Names match exactly, so `/request` never catches
/// `/requestaccess` and `/list` never catches `/lists`. Returns `None` for non-commands.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix('/')?;
    let (head, args) = match body.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (body, ""),
    };
    let name = head.split_once('@').map_or(head, |(name, _bot)| name);
    if name.is_empty() {
        return None;
    }

    Some(match name {
        "start" => BotCommand::Start,
        "help" => BotCommand::Help,
        "adminhelp" => BotCommand::AdminHelp,
        "myid" => BotCommand::MyId,
        "request" => BotCommand::Request,
        "cancel" => BotCommand::Cancel,
        "status" => BotCommand::Status,
        "requestaccess" => BotCommand::RequestAccess,
        "pending" => BotCommand::Pending,
        "list" => BotCommand::List,
        "adduser" => BotCommand::AddUser(parse_user_id(args)),
        "removeuser" => BotCommand::RemoveUser(parse_user_id(args)),
        "addadmin" => BotCommand::AddAdmin(parse_user_id(args)),
        "lists" => BotCommand::Lists(parse_status_filter(args)),
        "setstatus" => BotCommand::SetStatus(parse_status_update(args)),
        other => BotCommand::Unknown(other.to_owned()),
    })
}

fn parse_user_id(args: &str) -> Result<UserId, CommandArgError> {
    args.split_whitespace()
        .next()
        .and_then(|token| token.parse::<UserId>().ok())
        .ok_or(CommandArgError::InvalidUserId)
}

fn parse_status_filter(args: &str) -> Result<Option<RequestStatus>, CommandArgError> {
    match args.split_whitespace().next() {
        None => Ok(None),
        Some(token) => Ok(Some(token.parse::<RequestStatus>()?)),
    }
}

fn parse_status_update(args: &str) -> Result<(RequestId, RequestStatus), CommandArgError> {
    let mut parts = args.split_whitespace();
    let (Some(id), Some(status)) = (parts.next(), parts.next()) else {
        return Err(CommandArgError::SetStatusUsage);
    };
    let id = id.parse::<RequestId>().map_err(|_| CommandArgError::SetStatusUsage)?;
    Ok((id, status.parse::<RequestStatus>()?))
}

#[cfg(test)]
mod tests {
    use illustra_core::domain::request::{RequestId, RequestStatus, UnknownStatus};
    use illustra_core::domain::user::UserId;

    use super::{parse_command, BotCommand, CommandArgError};

    #[test]
    fn command_names_match_exactly() {
        assert_eq!(parse_command("/request"), Some(BotCommand::Request));
        assert_eq!(parse_command("/requestaccess"), Some(BotCommand::RequestAccess));
        assert_eq!(parse_command("/list"), Some(BotCommand::List));
        assert_eq!(parse_command("/lists"), Some(BotCommand::Lists(Ok(None))));
        assert_eq!(parse_command("/help"), Some(BotCommand::Help));
        assert_eq!(parse_command("/adminhelp"), Some(BotCommand::AdminHelp));
        assert_eq!(parse_command("/requests"), Some(BotCommand::Unknown("requests".to_owned())));
    }

    #[test]
    fn bot_suffix_and_surrounding_whitespace_are_ignored() {
        assert_eq!(parse_command("  /start@illustra_bot  "), Some(BotCommand::Start));
        assert_eq!(
            parse_command("/adduser@illustra_bot 12345"),
            Some(BotCommand::AddUser(Ok(UserId(12345))))
        );
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("Budi Santoso"), None);
        assert_eq!(parse_command("/"), None);
    }

    #[test]
    fn user_id_arguments_must_be_numeric() {
        assert_eq!(
            parse_command("/removeuser abc"),
            Some(BotCommand::RemoveUser(Err(CommandArgError::InvalidUserId)))
        );
        assert_eq!(
            parse_command("/addadmin"),
            Some(BotCommand::AddAdmin(Err(CommandArgError::InvalidUserId)))
        );
    }

    #[test]
    fn status_arguments_parse_case_insensitively() {
        assert_eq!(
            parse_command("/lists PROCESSING"),
            Some(BotCommand::Lists(Ok(Some(RequestStatus::Processing))))
        );
        assert_eq!(
            parse_command("/setstatus 4 completed"),
            Some(BotCommand::SetStatus(Ok((RequestId(4), RequestStatus::Completed))))
        );
        assert_eq!(
            parse_command("/setstatus 4 done"),
            Some(BotCommand::SetStatus(Err(CommandArgError::InvalidStatus(UnknownStatus(
                "done".to_owned()
            )))))
        );
        assert_eq!(
            parse_command("/setstatus x pending"),
            Some(BotCommand::SetStatus(Err(CommandArgError::SetStatusUsage)))
        );
        assert_eq!(
            parse_command("/setstatus 4"),
            Some(BotCommand::SetStatus(Err(CommandArgError::SetStatusUsage)))
        );
    }
}
