//! Command string parser
//!
//! Splits `verb:argument` on the first colon. The argument is kept
//! verbatim; compound arguments are split later, per verb.

use gadgetforge_core::Verb;

use crate::error::{Error, Result};

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command verb
    pub verb: Verb,

    /// Everything after the first colon
    pub raw_argument: String,
}

impl CommandSpec {
    /// Parse a command string
    pub fn parse(command: &str) -> Result<Self> {
        let (verb, argument) = command
            .split_once(':')
            .ok_or_else(|| Error::UnsupportedCommand(command.to_string()))?;

        let verb: Verb = verb
            .parse()
            .map_err(|_| Error::UnsupportedCommand(command.to_string()))?;

        Ok(Self {
            verb,
            raw_argument: argument.to_string(),
        })
    }

    /// Split a compound argument into exactly the verb's segment count.
    ///
    /// Verbs without a compound argument yield the whole argument as the
    /// single segment.
    pub fn segments(&self) -> Result<Vec<&str>> {
        let Some(expected) = self.verb.segments() else {
            return Ok(vec![self.raw_argument.as_str()]);
        };

        let parts: Vec<&str> = self.raw_argument.split('|').collect();
        if parts.len() != expected {
            return Err(Error::MalformedArgument {
                verb: self.verb,
                expected,
                found: parts.len(),
            });
        }
        if let Some(index) = parts.iter().position(|p| p.is_empty()) {
            return Err(Error::EmptySegment {
                verb: self.verb,
                index,
            });
        }
        Ok(parts)
    }
}
