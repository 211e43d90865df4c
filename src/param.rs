//! Typed animation parameters
//!
//! Scripts declare parameters with a type token and percent-encoded string
//! values. Values are parsed into [`ParamValue`] according to the declared
//! [`ParamType`] and rendered back to strings when sent to the child.

use std::collections::BTreeMap;
use std::fmt;

/// Parameter values keyed by lowercase name, iterated in name order
pub type ParamValues = BTreeMap<String, ParamValue>;

/// Declared parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Long,
    Double,
    Bool,
    Rgb,
    Argb,
    Gradient,
    AGradient,
    Angle,
    String,
    /// Display-only text; never meaningfully edited
    Label,
}

impl ParamType {
    /// Parse a lowercase type token from a `param` declaration.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "long" => ParamType::Long,
            "double" => ParamType::Double,
            "bool" => ParamType::Bool,
            "rgb" => ParamType::Rgb,
            "argb" => ParamType::Argb,
            "gradient" => ParamType::Gradient,
            "agradient" => ParamType::AGradient,
            "angle" => ParamType::Angle,
            "string" => ParamType::String,
            "label" => ParamType::Label,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Long => "long",
            ParamType::Double => "double",
            ParamType::Bool => "bool",
            ParamType::Rgb => "rgb",
            ParamType::Argb => "argb",
            ParamType::Gradient => "gradient",
            ParamType::AGradient => "agradient",
            ParamType::Angle => "angle",
            ParamType::String => "string",
            ParamType::Label => "label",
        }
    }

    /// Value used when a declared default does not parse.
    pub fn zero(&self) -> ParamValue {
        match self {
            ParamType::Long => ParamValue::Integer(0),
            ParamType::Double => ParamValue::Real(0.0),
            ParamType::Bool => ParamValue::Boolean(false),
            ParamType::Rgb => ParamValue::Color {
                argb: 0xff00_0000,
                alpha: false,
            },
            ParamType::Argb => ParamValue::Color {
                argb: 0,
                alpha: true,
            },
            ParamType::Gradient => ParamValue::Gradient {
                stops: Vec::new(),
                alpha: false,
            },
            ParamType::AGradient => ParamValue::Gradient {
                stops: Vec::new(),
                alpha: true,
            },
            ParamType::Angle => ParamValue::Angle(0),
            ParamType::String | ParamType::Label => ParamValue::Text(String::new()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One color stop of a gradient, position in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientStop {
    pub pos: u8,
    pub argb: u32,
}

/// A parsed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    /// `alpha` is false for `rgb` parameters, whose alpha is always opaque
    Color { argb: u32, alpha: bool },
    Gradient { stops: Vec<GradientStop>, alpha: bool },
    /// Degrees
    Angle(i64),
    Text(String),
}

impl ParamValue {
    /// Parse a decoded string as a value of the given type.
    pub fn parse(kind: ParamType, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match kind {
            ParamType::Long => raw.parse().ok().map(ParamValue::Integer),
            ParamType::Double => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ParamValue::Real),
            ParamType::Bool => parse_bool(raw).map(ParamValue::Boolean),
            ParamType::Rgb => parse_color(raw, false),
            ParamType::Argb => parse_color(raw, true),
            ParamType::Gradient => parse_gradient(raw, false),
            ParamType::AGradient => parse_gradient(raw, true),
            ParamType::Angle => raw.parse().ok().map(ParamValue::Angle),
            ParamType::String | ParamType::Label => Some(ParamValue::Text(raw.to_string())),
        }
    }

    /// Parse a minimum/maximum field; empty means no bound.
    pub fn parse_bound(kind: ParamType, raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        match kind {
            ParamType::Long | ParamType::Double | ParamType::Angle => Self::parse(kind, raw),
            _ => None,
        }
    }

    /// Numeric view, used for timing parameters and range checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(v) | ParamValue::Angle(v) => Some(*v as f64),
            ParamValue::Real(v) => Some(*v),
            ParamValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(v) | ParamValue::Angle(v) => write!(f, "{v}"),
            ParamValue::Real(v) => write!(f, "{v}"),
            ParamValue::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            ParamValue::Color { argb, alpha: true } => write!(f, "{argb:08x}"),
            ParamValue::Color { argb, alpha: false } => write!(f, "{:06x}", argb & 0x00ff_ffff),
            ParamValue::Gradient { stops, .. } => {
                for (i, stop) in stops.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}:{:08x}", stop.pos, stop.argb)?;
                }
                Ok(())
            }
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

fn parse_color(raw: &str, alpha: bool) -> Option<ParamValue> {
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let argb = match (hex.len(), alpha) {
        (6, _) => 0xff00_0000 | u32::from_str_radix(hex, 16).ok()?,
        (8, true) => u32::from_str_radix(hex, 16).ok()?,
        _ => return None,
    };
    Some(ParamValue::Color { argb, alpha })
}

/// Gradients are space-separated `pos:color` stops, e.g. `0:ffff0000 100:ff0000ff`.
fn parse_gradient(raw: &str, alpha: bool) -> Option<ParamValue> {
    let mut stops = Vec::new();
    for token in raw.split_whitespace() {
        let (pos, color) = token.split_once(':')?;
        let pos: u8 = pos.parse().ok()?;
        if pos > 100 {
            return None;
        }
        let argb = match parse_color(color, true)? {
            ParamValue::Color { argb, .. } if alpha => argb,
            ParamValue::Color { argb, .. } => argb | 0xff00_0000,
            _ => return None,
        };
        stops.push(GradientStop { pos, argb });
    }
    if stops.windows(2).any(|w| w[0].pos > w[1].pos) {
        return None;
    }
    Some(ParamValue::Gradient { stops, alpha })
}

/// One configurable parameter of an animation
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub kind: ParamType,
    /// Lowercase, unique within its descriptor
    pub name: String,
    pub prefix: String,
    pub postfix: String,
    pub default: ParamValue,
    pub minimum: Option<ParamValue>,
    pub maximum: Option<ParamValue>,
}

impl Param {
    /// A host-defined parameter with no display decoration.
    pub fn builtin(kind: ParamType, name: &str, default: ParamValue) -> Self {
        Self {
            kind,
            name: name.to_string(),
            prefix: String::new(),
            postfix: String::new(),
            default,
            minimum: None,
            maximum: None,
        }
    }

    pub fn with_range(mut self, minimum: ParamValue, maximum: ParamValue) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// Check a value against this parameter's type and range.
    ///
    /// The declared default is always accepted, even outside the range
    /// (`stop = -1` means "never").
    pub fn accepts(&self, value: &ParamValue) -> bool {
        if value == &self.default {
            return true;
        }
        if std::mem::discriminant(value) != std::mem::discriminant(&self.default) {
            return false;
        }
        let Some(v) = value.as_f64() else {
            return true;
        };
        let above_min = self
            .minimum
            .as_ref()
            .and_then(ParamValue::as_f64)
            .map_or(true, |min| v >= min);
        let below_max = self
            .maximum
            .as_ref()
            .and_then(ParamValue::as_f64)
            .map_or(true, |max| v <= max);
        above_min && below_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tokens() {
        assert_eq!(ParamType::from_token("agradient"), Some(ParamType::AGradient));
        assert_eq!(ParamType::from_token("label"), Some(ParamType::Label));
        assert_eq!(ParamType::from_token("float"), None);
        assert_eq!(ParamType::Double.to_string(), "double");
    }

    #[test]
    fn test_numeric_values() {
        assert_eq!(ParamValue::parse(ParamType::Long, "-1"), Some(ParamValue::Integer(-1)));
        assert_eq!(ParamValue::parse(ParamType::Long, "1.5"), None);
        assert_eq!(ParamValue::parse(ParamType::Double, " 2.5 "), Some(ParamValue::Real(2.5)));
        assert_eq!(ParamValue::parse(ParamType::Double, "inf"), None);
        assert_eq!(ParamValue::parse(ParamType::Angle, "90"), Some(ParamValue::Angle(90)));
    }

    #[test]
    fn test_bool_values() {
        assert_eq!(ParamValue::parse(ParamType::Bool, "TRUE"), Some(ParamValue::Boolean(true)));
        assert_eq!(ParamValue::parse(ParamType::Bool, "0"), Some(ParamValue::Boolean(false)));
        assert_eq!(ParamValue::parse(ParamType::Bool, "maybe"), None);
        assert_eq!(ParamValue::Boolean(true).to_string(), "true");
    }

    #[test]
    fn test_colors() {
        let rgb = ParamValue::parse(ParamType::Rgb, "ff8000").unwrap();
        assert_eq!(
            rgb,
            ParamValue::Color {
                argb: 0xffff_8000,
                alpha: false
            }
        );
        assert_eq!(rgb.to_string(), "ff8000");

        let argb = ParamValue::parse(ParamType::Argb, "#80ff0000").unwrap();
        assert_eq!(argb.to_string(), "80ff0000");

        assert_eq!(ParamValue::parse(ParamType::Rgb, "80ff0000"), None);
        assert_eq!(ParamValue::parse(ParamType::Rgb, "red"), None);
    }

    #[test]
    fn test_gradients() {
        let g = ParamValue::parse(ParamType::Gradient, "0:ffff0000 100:ff0000ff").unwrap();
        assert_eq!(g.to_string(), "0:ffff0000 100:ff0000ff");

        // Plain gradients are forced opaque
        let g = ParamValue::parse(ParamType::Gradient, "0:00ff0000").unwrap();
        assert_eq!(g.to_string(), "0:ffff0000");

        let ag = ParamValue::parse(ParamType::AGradient, "0:00ff0000 50:80ffffff").unwrap();
        assert_eq!(ag.to_string(), "0:00ff0000 50:80ffffff");

        assert_eq!(ParamValue::parse(ParamType::Gradient, "150:ffffffff"), None);
        assert_eq!(ParamValue::parse(ParamType::Gradient, "50:ffffffff 10:ff000000"), None);
        assert_eq!(ParamValue::parse(ParamType::Gradient, "nonsense"), None);
    }

    #[test]
    fn test_bounds_only_for_numbers() {
        assert_eq!(ParamValue::parse_bound(ParamType::Long, ""), None);
        assert_eq!(ParamValue::parse_bound(ParamType::Long, "10"), Some(ParamValue::Integer(10)));
        assert_eq!(ParamValue::parse_bound(ParamType::String, "10"), None);
    }

    #[test]
    fn test_accepts_range_and_default() {
        let stop = Param::builtin(ParamType::Long, "stop", ParamValue::Integer(-1))
            .with_range(ParamValue::Integer(0), ParamValue::Integer(1000));
        assert!(stop.accepts(&ParamValue::Integer(-1)));
        assert!(stop.accepts(&ParamValue::Integer(5)));
        assert!(!stop.accepts(&ParamValue::Integer(1001)));
        assert!(!stop.accepts(&ParamValue::Integer(-2)));
        assert!(!stop.accepts(&ParamValue::Real(5.0)));
    }
}
