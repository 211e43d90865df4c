//! Host → child commands for `--ckb-run` mode
//!
//! Every command renders to exactly one line (without the trailing newline).

use std::fmt;

use crate::encoding::encode_value;

/// Where a key event happened, as reported to the child
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTarget {
    Name(String),
    /// Coordinates relative to the top-left of the animated key set
    Position(i32, i32),
}

impl fmt::Display for KeyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyTarget::Name(name) => f.write_str(name),
            KeyTarget::Position(x, y) => write!(f, "{x},{y}"),
        }
    }
}

/// A single line sent to the animation's stdin
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    BeginKeymap,
    KeyCount(usize),
    /// `key <id> <x>,<y>` inside the keymap block
    KeyPosition { key: String, x: i32, y: i32 },
    EndKeymap,
    BeginParams,
    /// `param <name> <value>`, value percent-encoded on output
    Param { name: String, value: String },
    EndParams,
    BeginRun,
    /// Restart the animation
    Start,
    /// Advance by a fraction of one cycle
    Frame(f64),
    Key { target: KeyTarget, pressed: bool },
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::BeginKeymap => f.write_str("begin keymap"),
            HostCommand::KeyCount(count) => write!(f, "keycount {count}"),
            HostCommand::KeyPosition { key, x, y } => write!(f, "key {key} {x},{y}"),
            HostCommand::EndKeymap => f.write_str("end keymap"),
            HostCommand::BeginParams => f.write_str("begin params"),
            HostCommand::Param { name, value } => {
                write!(f, "param {name} {}", encode_value(value))
            }
            HostCommand::EndParams => f.write_str("end params"),
            HostCommand::BeginRun => f.write_str("begin run"),
            HostCommand::Start => f.write_str("start"),
            HostCommand::Frame(delta) => write!(f, "frame {delta}"),
            HostCommand::Key { target, pressed } => {
                write!(f, "key {target} {}", if *pressed { "down" } else { "up" })
            }
        }
    }
}

/// Build the `begin keymap` ... `end keymap` block for the given positions.
pub fn keymap_block<'a, I>(keys: I) -> Vec<HostCommand>
where
    I: IntoIterator<Item = (&'a str, i32, i32)>,
{
    let entries: Vec<HostCommand> = keys
        .into_iter()
        .map(|(key, x, y)| HostCommand::KeyPosition {
            key: key.to_string(),
            x,
            y,
        })
        .collect();

    let mut block = Vec::with_capacity(entries.len() + 3);
    block.push(HostCommand::BeginKeymap);
    block.push(HostCommand::KeyCount(entries.len()));
    block.extend(entries);
    block.push(HostCommand::EndKeymap);
    block
}

/// Build the `begin params` ... `end params` block.
pub fn params_block<'a, I>(params: I) -> Vec<HostCommand>
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    let mut block = vec![HostCommand::BeginParams];
    block.extend(params.into_iter().map(|(name, value)| HostCommand::Param {
        name: name.to_string(),
        value,
    }));
    block.push(HostCommand::EndParams);
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(cmds: &[HostCommand]) -> Vec<String> {
        cmds.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_frame_formatting() {
        assert_eq!(HostCommand::Frame(1.0).to_string(), "frame 1");
        assert_eq!(HostCommand::Frame(0.5).to_string(), "frame 0.5");
        assert_eq!(HostCommand::Frame(0.0).to_string(), "frame 0");
    }

    #[test]
    fn test_key_events() {
        let by_name = HostCommand::Key {
            target: KeyTarget::Name("esc".to_string()),
            pressed: true,
        };
        assert_eq!(by_name.to_string(), "key esc down");

        let by_pos = HostCommand::Key {
            target: KeyTarget::Position(12, 0),
            pressed: false,
        };
        assert_eq!(by_pos.to_string(), "key 12,0 up");
    }

    #[test]
    fn test_keymap_block() {
        let block = keymap_block([("esc", 0, 0), ("f1", 24, 0)]);
        assert_eq!(
            lines(&block),
            vec![
                "begin keymap",
                "keycount 2",
                "key esc 0,0",
                "key f1 24,0",
                "end keymap",
            ]
        );
    }

    #[test]
    fn test_empty_keymap_block() {
        let block = keymap_block(std::iter::empty());
        assert_eq!(lines(&block), vec!["begin keymap", "keycount 0", "end keymap"]);
    }

    #[test]
    fn test_params_block_encodes_values() {
        let block = params_block([
            ("color", "ffff0000".to_string()),
            ("label", "two words".to_string()),
        ]);
        assert_eq!(
            lines(&block),
            vec![
                "begin params",
                "param color ffff0000",
                "param label two%20words",
                "end params",
            ]
        );
    }
}
