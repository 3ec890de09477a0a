//! Commands of the interactive client.
//!
//! Lines starting with `/` are commands; anything else is a chat message.

use std::path::PathBuf;

use crate::parameters::ParameterName;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Upload a PDF and extract its characters.
    Extract { path: PathBuf, title: Option<String> },
    /// Extract characters from inline text.
    ExtractText { title: String, text: String },
    /// List extracted characters.
    Characters,
    /// Select a character by id.
    Select { id: String },
    /// Change one personality parameter.
    Set { name: ParameterName, value: f64 },
    /// Show the parameter panel.
    Params,
    /// Show the emotional state panel.
    Emotions,
    /// Print the conversation.
    History,
    Help,
    Quit,
    /// Send a chat message.
    Say(String),
}

impl std::fmt::Display for ReplCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extract { .. } => write!(f, "/extract"),
            Self::ExtractText { .. } => write!(f, "/extract-text"),
            Self::Characters => write!(f, "/characters"),
            Self::Select { .. } => write!(f, "/select"),
            Self::Set { .. } => write!(f, "/set"),
            Self::Params => write!(f, "/params"),
            Self::Emotions => write!(f, "/emotions"),
            Self::History => write!(f, "/history"),
            Self::Help => write!(f, "/help"),
            Self::Quit => write!(f, "/quit"),
            Self::Say(_) => write!(f, "say"),
        }
    }
}

pub const HELP: &str = "\
/extract <pdf> [title]           extract characters from a PDF
/extract-text <title> :: <text>  extract characters from plain text
/characters                      list characters
/select <id>                     chat with a character
/set <parameter> <value>         set a parameter (1-7)
/params                          show parameters
/emotions                        show the character's emotional state
/history                         show the conversation
/help                            this help
/quit                            exit
anything else                    send as a message";

/// Parse one input line.
///
/// Returns `Ok(None)` for a blank line and `Err` with a usage hint for a
/// malformed command.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if !line.starts_with('/') {
        return Ok(Some(ReplCommand::Say(line.to_string())));
    }

    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    let command = match cmd {
        "/extract" => {
            let (path, title) = match rest.split_once(char::is_whitespace) {
                Some((path, title)) => (path, Some(title.trim().to_string())),
                None => (rest, None),
            };
            if path.is_empty() {
                return Err("usage: /extract <pdf> [title]".into());
            }
            ReplCommand::Extract {
                path: PathBuf::from(path),
                title,
            }
        }
        "/extract-text" => match rest.split_once("::") {
            Some((title, text)) if !title.trim().is_empty() && !text.trim().is_empty() => {
                ReplCommand::ExtractText {
                    title: title.trim().to_string(),
                    text: text.trim().to_string(),
                }
            }
            _ => return Err("usage: /extract-text <title> :: <text>".into()),
        },
        "/characters" | "/chars" => ReplCommand::Characters,
        "/select" => {
            if rest.is_empty() {
                return Err("usage: /select <id>".into());
            }
            ReplCommand::Select {
                id: rest.to_string(),
            }
        }
        "/set" => {
            let mut parts = rest.split_whitespace();
            let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err("usage: /set <parameter> <value>".into());
            };
            let name: ParameterName = name.parse()?;
            let value: f64 = value
                .parse()
                .map_err(|_| format!("'{}' is not a number", value))?;
            ReplCommand::Set { name, value }
        }
        "/params" => ReplCommand::Params,
        "/emotions" => ReplCommand::Emotions,
        "/history" => ReplCommand::History,
        "/help" | "/?" => ReplCommand::Help,
        "/quit" | "/exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{}', try /help", other)),
    };
    Ok(Some(command))
}
