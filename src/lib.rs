// ckb animation host - shared library
// Script discovery, descriptor parsing, and per-animation sessions

pub mod clock;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod keymap;
pub mod param;
pub mod probe;
pub mod process;
pub mod registry;
pub mod session;
pub mod sink;

pub use clock::{FrameClock, Timing};
pub use config::DriverConfig;
pub use descriptor::Descriptor;
pub use error::AnimError;
pub use keymap::{KeyMap, KeyPos};
pub use param::{GradientStop, Param, ParamType, ParamValue, ParamValues};
pub use probe::probe;
pub use process::{AnimProcess, ChildProcess, ChildSpawner, Spawner};
pub use registry::Registry;
pub use session::Session;
pub use sink::{ColorMap, ColorSink, LatestColors};

pub use anim_protocol::KeypressMode;
