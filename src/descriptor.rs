//! Animation descriptors built from `--ckb-info` declarations
//!
//! A descriptor is the validated, static metadata of one script: identity,
//! timing behaviour, and its parameter list. Loading applies the parameter
//! rules below and then appends the host-defined timing parameters every
//! script gets (`trigger`, `delay`, `repeat`, `stop` and their keypress
//! counterparts).

use std::path::{Path, PathBuf};

use anim_protocol::{Declaration, KeypressMode, MetaField, ParamDecl};
use tracing::debug;
use uuid::Uuid;

use crate::error::AnimError;
use crate::param::{Param, ParamType, ParamValue, ParamValues};

/// Longest allowed duration, delay or repeat interval in seconds
pub const ONE_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Shortest allowed duration in seconds
pub const MIN_DURATION: f64 = 0.1;

/// Duration used when a relative-time script declares none
pub const DEFAULT_DURATION: f64 = 1.0;

/// Parameters owned by the host; scripts may not declare them
pub const RESERVED_PARAMS: &[&str] = &[
    "delay", "kpdelay", "repeat", "kprepeat", "stop", "kpstop", "kprelease",
];

/// Validated metadata for one animation script
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub year: String,
    pub author: String,
    pub license: String,
    pub description: String,
    pub keypress_mode: KeypressMode,
    /// Frames carry elapsed seconds instead of a cycle fraction
    pub absolute_time: bool,
    /// Retriggering restarts mid-cycle instead of from phase 0
    pub preempt: bool,
    /// Parameter changes are pushed to a running script
    pub live_params: bool,
    /// Loops by default
    pub repeat: bool,
    params: Vec<Param>,
    path: Option<PathBuf>,
}

impl Descriptor {
    /// Build a descriptor from declaration output, one line per item.
    ///
    /// Malformed and unknown lines are skipped. Fails if any of guid, name,
    /// version, year, author or license is missing.
    pub fn from_declarations<I, S>(lines: I) -> Result<Self, AnimError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = DescriptorBuilder::new();
        for line in lines {
            match Declaration::parse(line.as_ref()) {
                Ok(decl) => builder.apply(decl),
                Err(e) => debug!("Skipping declaration: {e}"),
            }
        }
        builder.finish()
    }

    /// Executable this descriptor was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// All parameters in declaration order, host parameters last.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Look up a parameter by name (case-insensitive).
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// Parameter values for a freshly configured animation.
    pub fn default_values(&self) -> ParamValues {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect()
    }

    /// Parse a user-supplied value for the named parameter.
    pub fn parse_value(&self, name: &str, raw: &str) -> Result<ParamValue, AnimError> {
        let param = self
            .param(name)
            .ok_or_else(|| AnimError::UnknownParam(name.to_string()))?;
        ParamValue::parse(param.kind, raw)
            .filter(|v| param.accepts(v))
            .ok_or_else(|| AnimError::InvalidParam {
                name: param.name.clone(),
                value: raw.to_string(),
            })
    }

    /// Id rendered the way it is appended to duplicate names.
    pub fn id_string(&self) -> String {
        self.id.braced().to_string().to_uppercase()
    }
}

/// Accumulates declarations before validation
struct DescriptorBuilder {
    guid: Uuid,
    name: String,
    version: String,
    year: String,
    author: String,
    license: String,
    description: String,
    keypress_mode: KeypressMode,
    absolute_time: bool,
    preempt: bool,
    live_params: bool,
    repeat: bool,
    params: Vec<Param>,
    declared_duration: Option<f64>,
}

impl DescriptorBuilder {
    fn new() -> Self {
        Self {
            guid: Uuid::nil(),
            name: String::new(),
            version: String::new(),
            year: String::new(),
            author: String::new(),
            license: String::new(),
            description: String::new(),
            keypress_mode: KeypressMode::None,
            absolute_time: false,
            preempt: false,
            live_params: false,
            repeat: true,
            params: Vec::new(),
            declared_duration: None,
        }
    }

    fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name.eq_ignore_ascii_case(name))
    }

    fn apply(&mut self, decl: Declaration) {
        match decl {
            Declaration::Meta(field, value) => match field {
                MetaField::Guid => self.guid = Uuid::parse_str(&value).unwrap_or_default(),
                MetaField::Name => self.name = value,
                MetaField::Version => self.version = value,
                MetaField::Year => self.year = value,
                MetaField::Author => self.author = value,
                MetaField::License => self.license = value,
                MetaField::Description => self.description = value,
            },
            Declaration::KeypressMode(mode) => self.keypress_mode = mode,
            Declaration::Time { absolute } => {
                // A declared duration already fixes relative timing
                if self.declared_duration.is_none() {
                    self.absolute_time = absolute;
                }
            }
            Declaration::Repeat(on) => self.repeat = on,
            Declaration::Preempt(on) => self.preempt = on,
            Declaration::ParamMode { live } => self.live_params = live,
            Declaration::Param(decl) => self.add_param(decl),
        }
    }

    fn add_param(&mut self, decl: ParamDecl) {
        let Some(kind) = ParamType::from_token(&decl.kind) else {
            debug!("Skipping param {} with unknown type {}", decl.name, decl.kind);
            return;
        };
        if self.has_param(&decl.name) {
            debug!("Skipping duplicate param {}", decl.name);
            return;
        }

        let default = ParamValue::parse(kind, &decl.default).unwrap_or_else(|| kind.zero());
        let mut minimum = ParamValue::parse_bound(kind, &decl.minimum);
        let mut maximum = ParamValue::parse_bound(kind, &decl.maximum);

        match decl.name.as_str() {
            "trigger" | "kptrigger" if kind != ParamType::Bool => {
                debug!("Skipping non-boolean {}", decl.name);
                return;
            }
            "duration" => {
                let value = default.as_f64().unwrap_or(0.0);
                if self.absolute_time
                    || kind != ParamType::Double
                    || !(MIN_DURATION..=ONE_DAY).contains(&value)
                {
                    debug!("Skipping invalid duration {:?}", decl.default);
                    return;
                }
                minimum = Some(ParamValue::Real(MIN_DURATION));
                maximum = Some(ParamValue::Real(ONE_DAY));
                self.declared_duration = Some(value);
            }
            name if RESERVED_PARAMS.contains(&name) => {
                debug!("Ignoring reserved param {name}");
                return;
            }
            _ => {}
        }

        self.params.push(Param {
            kind,
            name: decl.name,
            prefix: decl.prefix,
            postfix: decl.postfix,
            default,
            minimum,
            maximum,
        });
    }

    fn finish(mut self) -> Result<Descriptor, AnimError> {
        if self.guid.is_nil() {
            return Err(AnimError::MissingField("guid"));
        }
        let required = [
            ("name", &self.name),
            ("version", &self.version),
            ("year", &self.year),
            ("author", &self.author),
            ("license", &self.license),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(AnimError::MissingField(*field));
        }

        self.append_timing_params();

        Ok(Descriptor {
            id: self.guid,
            name: self.name,
            version: self.version,
            year: self.year,
            author: self.author,
            license: self.license,
            description: self.description,
            keypress_mode: self.keypress_mode,
            absolute_time: self.absolute_time,
            preempt: self.preempt,
            live_params: self.live_params,
            repeat: self.repeat,
            params: self.params,
            path: None,
        })
    }

    fn append_timing_params(&mut self) {
        use ParamValue::{Boolean, Integer, Real};

        if !self.has_param("trigger") {
            self.params
                .push(Param::builtin(ParamType::Bool, "trigger", Boolean(true)));
        }
        if !self.has_param("kptrigger") {
            self.params
                .push(Param::builtin(ParamType::Bool, "kptrigger", Boolean(false)));
        }
        if self.absolute_time || !self.repeat {
            self.preempt = false;
        }

        let seconds = |name: &str, default: f64, min: f64| {
            Param::builtin(ParamType::Double, name, Real(default))
                .with_range(Real(min), Real(ONE_DAY))
        };
        self.params.push(seconds("delay", 0.0, 0.0));
        self.params.push(seconds("kpdelay", 0.0, 0.0));
        self.params
            .push(Param::builtin(ParamType::Bool, "kprelease", Boolean(false)));

        let duration = match self.declared_duration {
            Some(duration) => duration,
            None => {
                if !self.absolute_time {
                    self.params
                        .push(seconds("duration", DEFAULT_DURATION, MIN_DURATION));
                }
                DEFAULT_DURATION
            }
        };

        if self.repeat {
            // Looping: stop counts repeats
            let count = |name: &str, default: i64| {
                Param::builtin(ParamType::Long, name, Integer(default))
                    .with_range(Integer(0), Integer(1000))
            };
            self.params.push(seconds("repeat", duration, MIN_DURATION));
            self.params.push(seconds("kprepeat", duration, MIN_DURATION));
            self.params.push(count("stop", -1));
            self.params.push(count("kpstop", 0));
        } else {
            // One-shot: stop is a time in seconds
            self.params.push(seconds("stop", -1.0, MIN_DURATION));
            self.params.push(seconds("kpstop", -1.0, MIN_DURATION));
        }
    }
}
