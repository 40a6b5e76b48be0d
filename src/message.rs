//! Message protocol definitions
//!
//! Line-based protocol. Inbound lines are parsed into [`Command`]s;
//! outbound payloads are [`ServerMessage`]s rendered through `Display`.

use std::fmt;

use crate::error::AppError;
use crate::types::UserId;

/// Literal that requests the roster
pub const WHO_COMMAND: &str = "\\who";

/// Prefix that marks a rename command
pub const RENAME_PREFIX: &str = "\\rename";

/// Separator between the rename prefix and the new name
pub const RENAME_SEPARATOR: char = '|';

/// Shortest accepted display name, in characters
pub const MIN_NAME_LEN: usize = 2;

/// Reply sent after a successful rename
pub const RENAME_ACK: &str = "rename successfully!";

/// Client → Server message
///
/// Parsed from one framed line, before any trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Roster request (`\who`, exact match)
    Who,
    /// Change display name (`\rename|<name>`)
    Rename(String),
    /// Anything else, forwarded verbatim
    Chat(String),
}

impl Command {
    /// Parse a framed line into a command
    ///
    /// Only a line starting with `\rename` can fail; everything that is not
    /// a command is chat.
    pub fn parse(line: &str) -> Result<Self, AppError> {
        if line == WHO_COMMAND {
            return Ok(Command::Who);
        }

        // Every `\rename...` line is a command, however short; a malformed
        // one is answered with an error instead of being broadcast as chat
        let Some(rest) = line.strip_prefix(RENAME_PREFIX) else {
            return Ok(Command::Chat(line.to_string()));
        };

        let Some(payload) = rest.strip_prefix(RENAME_SEPARATOR) else {
            return Err(AppError::MalformedRename(format!(
                "expected {}{}<name>",
                RENAME_PREFIX, RENAME_SEPARATOR
            )));
        };

        // `\rename|Bob|ignored` renames to `Bob`
        let name = payload.split(RENAME_SEPARATOR).next().unwrap_or_default();
        if name.trim().is_empty() || name.chars().count() < MIN_NAME_LEN {
            return Err(AppError::MalformedRename(format!(
                "name must be at least {} characters",
                MIN_NAME_LEN
            )));
        }

        Ok(Command::Rename(name.to_string()))
    }
}

/// Server → Client message
///
/// Everything that can land in a mailbox. Each value is written to the
/// socket as one newline-terminated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Answer to `\who`: `(id, name)` pairs in registry order
    Roster(Vec<(UserId, String)>),
    /// Rename succeeded
    RenameAck,
    /// Chat line from a user
    Chat {
        from: UserId,
        name: String,
        text: String,
    },
    /// A user connected
    Login { id: UserId, name: String },
    /// A user left (quit, disconnect or error)
    Logout { name: String },
    /// A user was evicted for inactivity
    TimedOut { name: String },
    /// Error reply to the requesting client only
    Error(String),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Roster(entries) => {
                let lines: Vec<String> = entries
                    .iter()
                    .map(|(id, name)| format!("id:{}, name:{}", id, name))
                    .collect();
                write!(f, "{}", lines.join("\n"))
            }
            ServerMessage::RenameAck => write!(f, "{}", RENAME_ACK),
            ServerMessage::Chat { from, name, text } => {
                write!(f, "[{}]:[{}] ===> {}", from, name, text)
            }
            ServerMessage::Login { id, name } => write!(f, "[{}]:[{}] ===> login!!", id, name),
            ServerMessage::Logout { name } => write!(f, "{} exit already!", name),
            ServerMessage::TimedOut { name } => write!(f, "{} timeout exit already!", name),
            ServerMessage::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<&AppError> for ServerMessage {
    fn from(err: &AppError) -> Self {
        let message = match err {
            AppError::MalformedRename(reason) => format!("malformed rename: {}", reason),
            AppError::UserNotFound(_) => "you are no longer connected".to_string(),
            AppError::Codec(_) => "line too long or not valid UTF-8".to_string(),
            // Fatal errors are not typically converted (connection closes)
            _ => "internal error".to_string(),
        };
        ServerMessage::Error(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(port: u16) -> UserId {
        UserId(format!("127.0.0.1:{}", port).parse().unwrap())
    }

    #[test]
    fn test_parse_who_exact() {
        assert_eq!(Command::parse("\\who").unwrap(), Command::Who);
        // Not an exact match: plain chat
        assert_eq!(
            Command::parse("\\who ").unwrap(),
            Command::Chat("\\who ".to_string())
        );
        assert_eq!(
            Command::parse("\\whoami").unwrap(),
            Command::Chat("\\whoami".to_string())
        );
    }

    #[test]
    fn test_parse_rename() {
        assert_eq!(
            Command::parse("\\rename|Bob").unwrap(),
            Command::Rename("Bob".to_string())
        );
        assert_eq!(
            Command::parse("\\rename|Bob|extra").unwrap(),
            Command::Rename("Bob".to_string())
        );
    }

    #[test]
    fn test_parse_rename_malformed() {
        for line in ["\\rename", "\\rename|", "\\rename|x", "\\renameBob", "\\rename|  "] {
            let err = Command::parse(line).unwrap_err();
            assert!(
                matches!(err, AppError::MalformedRename(_)),
                "{:?} should be malformed",
                line
            );
        }
    }

    #[test]
    fn test_short_rename_lines_are_never_chat() {
        // Short or pipe-less rename lines are answered, not broadcast
        for line in ["\\rename", "\\rename|", "\\renamefoo", "\\rename|a"] {
            assert!(
                !matches!(Command::parse(line), Ok(Command::Chat(_))),
                "{:?} was treated as chat",
                line
            );
        }
    }

    #[test]
    fn test_parse_chat_is_verbatim() {
        assert_eq!(
            Command::parse("  hello there  ").unwrap(),
            Command::Chat("  hello there  ".to_string())
        );
        assert_eq!(Command::parse("").unwrap(), Command::Chat(String::new()));
    }

    #[test]
    fn test_render_chat_and_login() {
        let chat = ServerMessage::Chat {
            from: id(5000),
            name: "Alice".to_string(),
            text: "hello".to_string(),
        };
        assert_eq!(chat.to_string(), "[127.0.0.1:5000]:[Alice] ===> hello");

        let login = ServerMessage::Login {
            id: id(5000),
            name: "127.0.0.1:5000".to_string(),
        };
        assert_eq!(
            login.to_string(),
            "[127.0.0.1:5000]:[127.0.0.1:5000] ===> login!!"
        );
    }

    #[test]
    fn test_render_roster() {
        let roster = ServerMessage::Roster(vec![
            (id(1), "a".to_string()),
            (id(2), "Bob".to_string()),
        ]);
        assert_eq!(
            roster.to_string(),
            "id:127.0.0.1:1, name:a\nid:127.0.0.1:2, name:Bob"
        );
    }

    #[test]
    fn test_render_logouts() {
        let name = "Bob".to_string();
        assert_eq!(
            ServerMessage::Logout { name: name.clone() }.to_string(),
            "Bob exit already!"
        );
        assert_eq!(
            ServerMessage::TimedOut { name }.to_string(),
            "Bob timeout exit already!"
        );
    }

    #[test]
    fn test_error_reply_from_app_error() {
        let msg = ServerMessage::from(&AppError::MalformedRename("bad".to_string()));
        assert_eq!(msg.to_string(), "error: malformed rename: bad");
    }
}
