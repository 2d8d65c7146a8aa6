//! One-shot client command surface.
//!
//! External tooling issues a single read or write per invocation against
//! an already open segment: parse the command words, attach, execute,
//! detach. The command set mirrors what the consumer-side bindings expect.

use std::fmt;

use thiserror::Error;

use omni_common::regions::OmniFeedback;

use crate::channel::ShmChannel;
use crate::error::ShmError;

/// Errors from parsing or executing a client command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("command '{0}' requires a payload of 3 values")]
    MissingPayload(String),
    #[error("invalid payload value '{0}'")]
    InvalidPayload(String),
    #[error(transparent)]
    Shm(#[from] ShmError),
}

/// A single parsed client command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ReadTransform,
    ReadPosition,
    ReadJoint,
    ReadButton,
    WriteForce([f64; 3]),
}

/// Result of executing a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Floating-point vector (positions, joints, transforms).
    Floats(Vec<f64>),
    /// Integer vector (button states).
    Ints(Vec<i32>),
    /// Writes produce no output.
    None,
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Floats(values) => {
                let strings: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
                write!(f, "{}", strings.join(" "))
            }
            Self::Ints(values) => {
                let strings: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", strings.join(" "))
            }
            Self::None => Ok(()),
        }
    }
}

impl Command {
    /// Parse command words as given on a client command line, e.g.
    /// `["read", "position"]` or `["write", "force", "0.5", "0", "-1"]`.
    pub fn parse(words: &[String]) -> Result<Self, CommandError> {
        let verb = words
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        match verb.as_str() {
            "read transform" => Ok(Self::ReadTransform),
            "read position" => Ok(Self::ReadPosition),
            "read joint" => Ok(Self::ReadJoint),
            "read button" => Ok(Self::ReadButton),
            "write force" => {
                let payload = &words[2..];
                if payload.len() != 3 {
                    return Err(CommandError::MissingPayload(verb));
                }
                let mut force = [0.0f64; 3];
                for (slot, word) in force.iter_mut().zip(payload) {
                    *slot = word
                        .parse()
                        .map_err(|_| CommandError::InvalidPayload(word.clone()))?;
                }
                Ok(Self::WriteForce(force))
            }
            _ => Err(CommandError::Unknown(words.join(" "))),
        }
    }

    /// Execute against an open channel.
    pub fn execute(&self, channel: &mut ShmChannel) -> Result<CommandOutput, CommandError> {
        match self {
            Self::ReadTransform => {
                let snapshot = channel.snapshot();
                Ok(CommandOutput::Floats(snapshot.omni.transform.to_vec()))
            }
            Self::ReadPosition => {
                let snapshot = channel.snapshot();
                Ok(CommandOutput::Floats(
                    snapshot.omni.position.to_array().to_vec(),
                ))
            }
            Self::ReadJoint => {
                let snapshot = channel.snapshot();
                // Consumers see the first six mapped angles widened to f64.
                Ok(CommandOutput::Floats(
                    snapshot.omni.thetas[..6].iter().map(|&t| f64::from(t)).collect(),
                ))
            }
            Self::ReadButton => {
                let snapshot = channel.snapshot();
                Ok(CommandOutput::Ints(snapshot.omni.buttons.to_vec()))
            }
            Self::WriteForce(force) => {
                // Preserve the anchor position already in the write region.
                let mut feedback: OmniFeedback = channel.fetch();
                feedback.force = omni_common::regions::ShmVector3d::from_array(*force);
                channel.push_feedback(&feedback);
                Ok(CommandOutput::None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn parse_reads() {
        assert_eq!(
            Command::parse(&words("read transform")).unwrap(),
            Command::ReadTransform
        );
        assert_eq!(
            Command::parse(&words("read position")).unwrap(),
            Command::ReadPosition
        );
        assert_eq!(
            Command::parse(&words("read joint")).unwrap(),
            Command::ReadJoint
        );
        assert_eq!(
            Command::parse(&words("read button")).unwrap(),
            Command::ReadButton
        );
    }

    #[test]
    fn parse_write_force() {
        assert_eq!(
            Command::parse(&words("write force 0.5 -0.5 1.0")).unwrap(),
            Command::WriteForce([0.5, -0.5, 1.0])
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            Command::parse(&words("read velocity")),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(
            Command::parse(&words("write force 1.0")),
            Err(CommandError::MissingPayload(_))
        ));
        assert!(matches!(
            Command::parse(&words("write force a b c")),
            Err(CommandError::InvalidPayload(_))
        ));
        assert!(matches!(
            Command::parse(&words("")),
            Err(CommandError::Unknown(_))
        ));
    }

    #[test]
    fn output_formatting() {
        assert_eq!(
            CommandOutput::Floats(vec![1.0, 2.5]).to_string(),
            "1.000000 2.500000"
        );
        assert_eq!(CommandOutput::Ints(vec![1, 0]).to_string(), "1 0");
        assert_eq!(CommandOutput::None.to_string(), "");
    }
}
