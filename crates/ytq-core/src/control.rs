//! Daemon control protocol: one text command per line over a Unix socket.
//!
//! `cancel <job-id>` stops the queued tasks of a job; `fetch` runs one
//! discovery cycle now.

use std::path::PathBuf;
use uuid::Uuid;

use crate::model::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Cancel(JobId),
    Fetch,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`cancel` needs a job id")]
    MissingJobId,
    #[error("invalid job id `{0}`")]
    InvalidJobId(String),
    #[error("unexpected argument `{0}`")]
    TrailingArgument(String),
}

impl ControlCommand {
    pub fn parse(line: &str) -> Result<Self, ControlParseError> {
        let mut words = line.split_whitespace();
        let cmd = words.next().ok_or(ControlParseError::Empty)?;
        let parsed = match cmd.to_ascii_lowercase().as_str() {
            "cancel" => {
                let raw = words.next().ok_or(ControlParseError::MissingJobId)?;
                let id = Uuid::parse_str(raw).map_err(|_| ControlParseError::InvalidJobId(raw.to_string()))?;
                ControlCommand::Cancel(id)
            }
            "fetch" => ControlCommand::Fetch,
            other => return Err(ControlParseError::Unknown(other.to_string())),
        };
        if let Some(extra) = words.next() {
            return Err(ControlParseError::TrailingArgument(extra.to_string()));
        }
        Ok(parsed)
    }

    /// Wire form, as sent by the client.
    pub fn to_line(&self) -> String {
        match self {
            ControlCommand::Cancel(id) => format!("cancel {id}"),
            ControlCommand::Fetch => "fetch".to_string(),
        }
    }
}

/// Default path for the control socket (same XDG state dir as the DB).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("ytq")?.get_state_home();
    Ok(dir.join("control.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        let id = Uuid::new_v4();
        assert_eq!(
            ControlCommand::parse(&format!("cancel {id}\n")),
            Ok(ControlCommand::Cancel(id))
        );
        assert_eq!(ControlCommand::parse("  FETCH "), Ok(ControlCommand::Fetch));
        assert_eq!(
            ControlCommand::parse(&ControlCommand::Cancel(id).to_line()),
            Ok(ControlCommand::Cancel(id))
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(ControlCommand::parse(""), Err(ControlParseError::Empty));
        assert_eq!(ControlCommand::parse("cancel"), Err(ControlParseError::MissingJobId));
        assert_eq!(
            ControlCommand::parse("cancel 42"),
            Err(ControlParseError::InvalidJobId("42".into()))
        );
        assert_eq!(
            ControlCommand::parse("pause 1"),
            Err(ControlParseError::Unknown("pause".into()))
        );
        assert_eq!(
            ControlCommand::parse("fetch now"),
            Err(ControlParseError::TrailingArgument("now".into()))
        );
    }
}
