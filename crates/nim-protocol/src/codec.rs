//! Framing and validation for the line-based text protocol.
//!
//! A "frame" is one `\n`-terminated line. This module turns raw bytes
//! into a command name plus its parameters, and separately validates
//! the two free-text fields (nicknames and room names) that appear
//! inside those parameters. Nothing here touches a socket — parsing
//! is pure, so it can be exhaustively unit tested without a server.

use crate::ProtocolError;

/// Whole-message size cap, in bytes, including the terminator.
pub const MAX_MESSAGE_LENGTH: usize = 512;
/// Maximum number of `;`-separated parameters after the command name.
pub const MAX_PARAMS: usize = 10;
/// Maximum length of a single parameter.
pub const MAX_PARAM_LENGTH: usize = 128;
/// Maximum nickname length.
pub const MAX_NICKNAME_LENGTH: usize = 32;
/// Maximum room name length.
pub const MAX_ROOM_NAME_LENGTH: usize = 64;

/// A line, tokenized into its command name and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub command: String,
    pub params: Vec<String>,
}

/// Splits one already-dequeued line (terminator already stripped by the
/// caller) into a [`ParsedMessage`].
///
/// Fields are `;`-separated; the first is the command, the rest are
/// parameters. Parameters beyond [`MAX_PARAMS`] are dropped rather than
/// rejected outright — a client sending extra fields it doesn't need
/// to isn't itself a format violation, matching the tolerant tokenizer
/// this protocol is modeled on. A parameter over [`MAX_PARAM_LENGTH`]
/// is an error, since silently truncating it could change its meaning
/// (e.g. a nickname).
pub fn parse_line(line: &str) -> Result<ParsedMessage, ProtocolError> {
    if line.is_empty() || line.len() >= MAX_MESSAGE_LENGTH {
        return Err(ProtocolError::LengthOutOfBounds(line.len()));
    }

    let mut fields = line.split(';');
    let command = fields.next().unwrap_or("").to_string();

    let mut params = Vec::new();
    for field in fields {
        if field.len() > MAX_PARAM_LENGTH {
            return Err(ProtocolError::ParamTooLong);
        }
        if params.len() >= MAX_PARAMS {
            return Err(ProtocolError::TooManyParams);
        }
        params.push(field.to_string());
    }

    Ok(ParsedMessage { command, params })
}

/// Strips the `\n` terminator and one optional preceding `\r` from a
/// raw line extracted from the per-connection byte buffer.
pub fn trim_terminator(raw: &str) -> &str {
    let without_lf = raw.strip_suffix('\n').unwrap_or(raw);
    without_lf.strip_suffix('\r').unwrap_or(without_lf)
}

/// Validates a nickname: nonempty, at most 32 bytes, alphanumeric or
/// `_`, first byte a letter.
pub fn validate_nickname(nickname: &str) -> bool {
    if nickname.is_empty() || nickname.len() > MAX_NICKNAME_LENGTH {
        return false;
    }
    let mut chars = nickname.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    nickname.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a room name: nonempty, at most 64 bytes, alphanumeric,
/// `_`, or space.
pub fn validate_room_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_ROOM_NAME_LENGTH {
        return false;
    }
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ')
}
