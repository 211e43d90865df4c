//! `run`: drive one animation at a fixed tick rate and print its colors

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use anim_driver::keymap::parse_key_list;
use anim_driver::sink::argb_channels;
use anim_driver::{AnimError, ColorMap, ColorSink, DriverConfig, ParamValue};

use super::{scanned_registry, setup_interrupt_handler};

pub struct RunOptions {
    pub animation: String,
    pub keys: Option<String>,
    pub params: Vec<String>,
    pub seconds: Option<f64>,
    pub presses: Vec<String>,
}

/// Prints a line whenever the committed colors change
#[derive(Default)]
struct StdoutSink {
    last: ColorMap,
}

impl ColorSink for StdoutSink {
    fn commit(&mut self, timestamp: u64, colors: &ColorMap) {
        if colors == &self.last {
            return;
        }
        self.last.clone_from(colors);
        let cells: Vec<String> = colors
            .iter()
            .map(|(key, argb)| {
                let (a, r, g, b) = argb_channels(*argb);
                format!("{key}=#{r:02x}{g:02x}{b:02x}/{a:02x}")
            })
            .collect();
        println!("{timestamp:>7}ms {}", cells.join(" "));
    }
}

/// Parse `KEY@MS` into a key id and a time offset
fn parse_press(spec: &str) -> Result<(String, u64)> {
    let (key, at) = spec
        .split_once('@')
        .ok_or_else(|| anyhow!("Expected KEY@MS, got {spec:?}"))?;
    let at = at
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid press time in {spec:?}"))?;
    Ok((key.trim().to_ascii_lowercase(), at))
}

pub fn run(config: &DriverConfig, options: &RunOptions) -> Result<()> {
    let registry = scanned_registry(config);
    let desc = registry
        .find(&options.animation)
        .ok_or_else(|| AnimError::NotFound(options.animation.clone()))?;
    let mut session = registry.copy(&desc.id)?;

    let keys = match &options.keys {
        Some(list) => parse_key_list(&config.keymap, list)
            .map_err(|unknown| anyhow!("Unknown keys: {}", unknown.join(", ")))?,
        None => config.keymap.keys().map(str::to_string).collect(),
    };

    let mut values = desc.default_values();
    for spec in &options.params {
        let (name, raw) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected NAME=VALUE, got {spec:?}"))?;
        let value = desc.parse_value(name.trim(), raw)?;
        values.insert(name.trim().to_ascii_lowercase(), value);
    }

    let mut presses = options
        .presses
        .iter()
        .map(|spec| parse_press(spec))
        .collect::<Result<Vec<_>>>()?;
    presses.sort_by_key(|(_, at)| *at);
    for (key, _) in &presses {
        if !config.keymap.contains(key) {
            warn!("Key {key} is not in the keymap");
        }
    }
    let mut presses: VecDeque<(String, u64)> = presses.into();
    let mut releases: VecDeque<(String, u64)> = VecDeque::new();

    let deadline = options
        .seconds
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("Invalid --seconds")?;
    let interval = config.frame_interval();
    let interval_ms = interval.as_millis() as u64;
    let trigger = values.get("trigger").and_then(ParamValue::as_bool) == Some(true);

    info!(
        "Running {} on {} keys at {} fps",
        desc.name,
        keys.len(),
        config.fps
    );
    session.init(config.keymap.clone(), keys, values);
    if trigger {
        session.retrigger(0, true);
    }

    let running = setup_interrupt_handler();
    let mut sink = StdoutSink::default();
    let started = Instant::now();

    while running.load(Ordering::SeqCst) {
        let elapsed = started.elapsed();
        if deadline.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        let now = elapsed.as_millis() as u64;

        while presses.front().is_some_and(|(_, at)| *at <= now) {
            if let Some((key, _)) = presses.pop_front() {
                session.keypress(&key, true, now);
                releases.push_back((key, now + interval_ms));
            }
        }
        while releases.front().is_some_and(|(_, at)| *at <= now) {
            if let Some((key, _)) = releases.pop_front() {
                session.keypress(&key, false, now);
            }
        }

        session.tick(now, &mut sink);
        if session.is_stopped() {
            info!("{} finished", desc.name);
            break;
        }
        thread::sleep(interval);
    }

    session.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_press() {
        assert_eq!(parse_press("A@250").unwrap(), ("a".to_string(), 250));
        assert_eq!(parse_press(" esc @ 0 ").unwrap(), ("esc".to_string(), 0));
        assert!(parse_press("a").is_err());
        assert!(parse_press("a@soon").is_err());
    }

    #[test]
    fn test_sink_prints_only_changes() {
        let mut sink = StdoutSink::default();
        let mut colors = ColorMap::new();
        colors.insert("a".to_string(), 0xff00_ff00);
        sink.commit(0, &colors);
        sink.commit(33, &colors);
        assert_eq!(sink.last, colors);
    }
}
