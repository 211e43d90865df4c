//! Line protocol spoken between the host and keyboard animation scripts
//!
//! Animation scripts are plain executables driven over stdio:
//!
//! - `--ckb-info`: the script prints its declarations and exits
//!   ([`Declaration`])
//! - `--ckb-run`: the host streams [`HostCommand`]s to stdin and reads frame
//!   blocks back from stdout ([`FrameReader`])

pub mod command;
pub mod declaration;
pub mod encoding;
pub mod error;
pub mod frame;

pub use command::{keymap_block, params_block, HostCommand, KeyTarget};
pub use declaration::{Declaration, KeypressMode, MetaField, ParamDecl};
pub use encoding::{decode_field, encode_value, parse_hex_u32};
pub use error::ProtocolError;
pub use frame::{parse_argb, ChildEvent, FrameReader};

/// Argument that asks a script for its declarations
pub const INFO_FLAG: &str = "--ckb-info";

/// Argument that starts a script in animation mode
pub const RUN_FLAG: &str = "--ckb-run";
