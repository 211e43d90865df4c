//! Tokenizer for `--ckb-info` declaration output
//!
//! Each line is `<key> <field> [<field>...]`, separated by single spaces.
//! Tokenizing is purely syntactic; validation of what the fields mean is
//! left to the descriptor loader.

use std::fmt;

use crate::encoding::decode_field;
use crate::error::ProtocolError;

/// How a script wants key events delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeypressMode {
    /// Key events are not forwarded; a key-down retriggers the animation
    #[default]
    None,
    /// `key <id> down|up`
    Name,
    /// `key <x>,<y> down|up`
    Position,
}

impl KeypressMode {
    /// Parse a `kpmode` value. Anything unrecognized means no forwarding.
    pub fn from_token(token: &str) -> Self {
        match token {
            "position" => KeypressMode::Position,
            "name" => KeypressMode::Name,
            _ => KeypressMode::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeypressMode::None => "none",
            KeypressMode::Name => "name",
            KeypressMode::Position => "position",
        }
    }
}

impl fmt::Display for KeypressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata fields that carry a single decoded string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaField {
    Guid,
    Name,
    Version,
    Year,
    Author,
    License,
    Description,
}

impl MetaField {
    fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "guid" => MetaField::Guid,
            "name" => MetaField::Name,
            "version" => MetaField::Version,
            "year" => MetaField::Year,
            "author" => MetaField::Author,
            "license" => MetaField::License,
            "description" => MetaField::Description,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetaField::Guid => "guid",
            MetaField::Name => "name",
            MetaField::Version => "version",
            MetaField::Year => "year",
            MetaField::Author => "author",
            MetaField::License => "license",
            MetaField::Description => "description",
        }
    }
}

/// Raw `param` declaration: `param <type> <name> <prefix> <postfix> <default> [<min>] [<max>]`
///
/// `kind` and `name` are lowercased; the remaining fields are percent-decoded.
/// Absent trailing fields are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub kind: String,
    pub name: String,
    pub prefix: String,
    pub postfix: String,
    pub default: String,
    pub minimum: String,
    pub maximum: String,
}

/// One recognized declaration line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Meta(MetaField, String),
    KeypressMode(KeypressMode),
    /// `time absolute` or anything else (relative)
    Time { absolute: bool },
    Repeat(bool),
    Preempt(bool),
    /// `parammode live` or anything else (static)
    ParamMode { live: bool },
    Param(ParamDecl),
}

impl Declaration {
    /// Tokenize one line of declaration output.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        let components: Vec<&str> = line.split(' ').collect();
        if components.len() < 2 {
            return Err(ProtocolError::TooFewFields(line.to_string()));
        }
        let key = components[0].trim();
        let value = components[1];

        if let Some(field) = MetaField::from_key(key) {
            return Ok(Declaration::Meta(field, decode_field(value)));
        }

        match key {
            "kpmode" => Ok(Declaration::KeypressMode(KeypressMode::from_token(value))),
            "time" => Ok(Declaration::Time {
                absolute: value == "absolute",
            }),
            "repeat" => Ok(Declaration::Repeat(value == "on")),
            "preempt" => Ok(Declaration::Preempt(value == "on")),
            "parammode" => Ok(Declaration::ParamMode {
                live: value == "live",
            }),
            "param" => parse_param(line, &components),
            other => Err(ProtocolError::UnknownDeclaration(other.to_string())),
        }
    }
}

fn parse_param(line: &str, components: &[&str]) -> Result<Declaration, ProtocolError> {
    if components.len() < 3 {
        return Err(ProtocolError::TooFewFields(line.to_string()));
    }
    let field = |idx: usize| components.get(idx).copied().unwrap_or("");
    Ok(Declaration::Param(ParamDecl {
        kind: field(1).to_lowercase(),
        name: field(2).to_lowercase(),
        prefix: decode_field(field(3)),
        postfix: decode_field(field(4)),
        default: decode_field(field(5)),
        minimum: decode_field(field(6)),
        maximum: decode_field(field(7)),
    }))
}
