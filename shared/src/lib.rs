//! Wire protocol shared by the relay server and its clients.
//!
//! Payloads are slash-delimited ASCII commands carried inside length-prefixed
//! frames (see [`framing`]). The server interprets only `UPDATE`; every other
//! payload is relayed untouched.

pub mod framing;

pub use framing::{encode_frame, FrameDecoder, FrameError, HEADER_LEN};

use std::fmt;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const MAX_CLIENTS: usize = 10;

pub const CMD_INIT: &str = "INIT";
pub const CMD_SPAWN: &str = "SPAWN";
pub const CMD_UPDATE: &str = "UPDATE";
pub const CMD_DESPAWN: &str = "DESPAWN";

/// Identity of a connected player; equal to the server slot index
pub type PlayerId = u32;

/// Position plus yaw of a player
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation_y: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, z: f32, rotation_y: f32) -> Self {
        Self {
            x,
            y,
            z,
            rotation_y,
        }
    }

    fn from_fields(fields: &[&str]) -> Result<Self, ParseError> {
        let number = |field: &str| {
            field
                .parse::<f32>()
                .map_err(|_| ParseError::InvalidNumber(field.to_string()))
        };

        Ok(Self {
            x: number(fields[0])?,
            y: number(fields[1])?,
            z: number(fields[2])?,
            rotation_y: number(fields[3])?,
        })
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.x, self.y, self.z, self.rotation_y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{command} needs {expected} fields, got {found}")]
    TooFewFields {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid player id {0:?}")]
    InvalidId(String),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
}

/// A decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Init { id: PlayerId, pose: Pose },
    Spawn { id: PlayerId, pose: Pose },
    Update { id: PlayerId, pose: Pose },
    Despawn { id: PlayerId },
    /// Anything without a recognised command token
    Other(String),
}

/// Returns the leading command token of a payload (text before the first `/`)
pub fn command_token(text: &str) -> &str {
    text.split_once('/').map_or(text, |(head, _)| head)
}

impl Message {
    /// Parses a payload
    ///
    /// Known commands must carry at least their required fields; extra
    /// trailing fields are ignored. Unknown commands become [`Message::Other`].
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = text.split('/').collect();

        match fields[0] {
            CMD_INIT => {
                let (id, pose) = parse_posed(CMD_INIT, &fields)?;
                Ok(Message::Init { id, pose })
            }
            CMD_SPAWN => {
                let (id, pose) = parse_posed(CMD_SPAWN, &fields)?;
                Ok(Message::Spawn { id, pose })
            }
            CMD_UPDATE => {
                let (id, pose) = parse_posed(CMD_UPDATE, &fields)?;
                Ok(Message::Update { id, pose })
            }
            CMD_DESPAWN => {
                require_fields(CMD_DESPAWN, &fields, 2)?;
                Ok(Message::Despawn {
                    id: parse_id(fields[1])?,
                })
            }
            _ => Ok(Message::Other(text.to_string())),
        }
    }

    /// Identity the message refers to, if it names one
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Message::Init { id, .. }
            | Message::Spawn { id, .. }
            | Message::Update { id, .. }
            | Message::Despawn { id } => Some(*id),
            Message::Other(_) => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Init { id, pose } => write!(f, "{}/{}/{}", CMD_INIT, id, pose),
            Message::Spawn { id, pose } => write!(f, "{}/{}/{}", CMD_SPAWN, id, pose),
            Message::Update { id, pose } => write!(f, "{}/{}/{}", CMD_UPDATE, id, pose),
            Message::Despawn { id } => write!(f, "{}/{}", CMD_DESPAWN, id),
            Message::Other(text) => f.write_str(text),
        }
    }
}

fn require_fields(command: &'static str, fields: &[&str], expected: usize) -> Result<(), ParseError> {
    if fields.len() < expected {
        return Err(ParseError::TooFewFields {
            command,
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn parse_id(field: &str) -> Result<PlayerId, ParseError> {
    field
        .parse::<PlayerId>()
        .map_err(|_| ParseError::InvalidId(field.to_string()))
}

fn parse_posed(command: &'static str, fields: &[&str]) -> Result<(PlayerId, Pose), ParseError> {
    require_fields(command, fields, 6)?;
    let id = parse_id(fields[1])?;
    let pose = Pose::from_fields(&fields[2..6])?;
    Ok((id, pose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_zero_pose_formatting() {
        let message = Message::Init {
            id: 0,
            pose: Pose::default(),
        };
        assert_eq!(message.to_string(), "INIT/0/0/0/0/0");
    }

    #[test]
    fn test_fractional_pose_formatting() {
        let message = Message::Spawn {
            id: 4,
            pose: Pose::new(1.5, -2.0, 0.25, 90.0),
        };
        assert_eq!(message.to_string(), "SPAWN/4/1.5/-2/0.25/90");
    }

    #[test]
    fn test_despawn_formatting() {
        assert_eq!(Message::Despawn { id: 7 }.to_string(), "DESPAWN/7");
    }

    #[test]
    fn test_parse_update() {
        let message = Message::parse("UPDATE/2/1.0/2.0/3.0/0.5").unwrap();

        match message {
            Message::Update { id, pose } => {
                assert_eq!(id, 2);
                assert_approx_eq!(pose.x, 1.0);
                assert_approx_eq!(pose.y, 2.0);
                assert_approx_eq!(pose.z, 3.0);
                assert_approx_eq!(pose.rotation_y, 0.5);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_parse_update_ignores_extra_fields() {
        let message = Message::parse("UPDATE/1/1/2/3/4/extra").unwrap();
        assert_eq!(
            message,
            Message::Update {
                id: 1,
                pose: Pose::new(1.0, 2.0, 3.0, 4.0)
            }
        );
    }

    #[test]
    fn test_parse_update_too_few_fields() {
        let result = Message::parse("UPDATE/1/2/3");
        assert_eq!(
            result,
            Err(ParseError::TooFewFields {
                command: CMD_UPDATE,
                expected: 6,
                found: 4
            })
        );
    }

    #[test]
    fn test_parse_update_non_numeric_id() {
        let result = Message::parse("UPDATE/abc/1/2/3/4");
        assert_eq!(result, Err(ParseError::InvalidId("abc".to_string())));
    }

    #[test]
    fn test_parse_update_negative_id() {
        let result = Message::parse("UPDATE/-1/1/2/3/4");
        assert_eq!(result, Err(ParseError::InvalidId("-1".to_string())));
    }

    #[test]
    fn test_parse_update_non_numeric_coordinate() {
        let result = Message::parse("UPDATE/1/1/north/3/4");
        assert_eq!(result, Err(ParseError::InvalidNumber("north".to_string())));
    }

    #[test]
    fn test_parse_despawn() {
        assert_eq!(
            Message::parse("DESPAWN/9").unwrap(),
            Message::Despawn { id: 9 }
        );
        assert!(Message::parse("DESPAWN").is_err());
    }

    #[test]
    fn test_parse_other_text() {
        assert_eq!(
            Message::parse("CHAT/hello there").unwrap(),
            Message::Other("CHAT/hello there".to_string())
        );
        assert_eq!(
            Message::parse("").unwrap(),
            Message::Other(String::new())
        );
    }

    #[test]
    fn test_command_token() {
        assert_eq!(command_token("UPDATE/1/2/3/4/5"), "UPDATE");
        assert_eq!(command_token("UPDATE"), "UPDATE");
        assert_eq!(command_token("hello world"), "hello world");
        assert_eq!(command_token("/leading"), "");
    }

    #[test]
    fn test_player_id() {
        assert_eq!(Message::Despawn { id: 3 }.player_id(), Some(3));
        assert_eq!(Message::Other("x".into()).player_id(), None);
    }

    #[test]
    fn test_formatted_message_parses_back() {
        let original = Message::Update {
            id: 5,
            pose: Pose::new(-12.75, 0.0, 3.125, 180.0),
        };
        let parsed = Message::parse(&original.to_string()).unwrap();
        assert_eq!(parsed, original);
    }
}
