//! Catalog commands: list, info

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use anim_driver::{probe, Descriptor, DriverConfig};

use super::scanned_registry;

/// One catalog row as printed by `list --json`
#[derive(Serialize)]
struct CatalogEntry<'a> {
    id: String,
    name: &'a str,
    version: &'a str,
    year: &'a str,
    author: &'a str,
    license: &'a str,
    description: &'a str,
    kpmode: &'static str,
    absolute_time: bool,
    repeat: bool,
    preempt: bool,
    live_params: bool,
    path: Option<&'a Path>,
}

impl<'a> From<&'a Descriptor> for CatalogEntry<'a> {
    fn from(desc: &'a Descriptor) -> Self {
        Self {
            id: desc.id_string(),
            name: &desc.name,
            version: &desc.version,
            year: &desc.year,
            author: &desc.author,
            license: &desc.license,
            description: &desc.description,
            kpmode: desc.keypress_mode.as_str(),
            absolute_time: desc.absolute_time,
            repeat: desc.repeat,
            preempt: desc.preempt,
            live_params: desc.live_params,
            path: desc.path(),
        }
    }
}

/// Scan the animations directory and print the catalog
pub fn list(config: &DriverConfig, json: bool) -> Result<()> {
    let registry = scanned_registry(config);

    if json {
        let entries: Vec<CatalogEntry> = registry.list().into_iter().map(Into::into).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No animations found in {}", registry.dir().display());
        return Ok(());
    }

    println!("Animations in {}:", registry.dir().display());
    for desc in registry.list() {
        println!(
            "  {:<32} {:<8} {:<20} {}",
            desc.name,
            desc.version,
            desc.author,
            desc.id_string()
        );
        println!("      {}", timing_summary(desc));
    }
    Ok(())
}

/// Probe one script and print its descriptor
pub fn info(config: &DriverConfig, path: &Path) -> Result<()> {
    let desc = probe(path, config.info_timeout())?;

    println!("Name:        {}", desc.name);
    println!("Id:          {}", desc.id_string());
    println!("Version:     {}", desc.version);
    println!("Year:        {}", desc.year);
    println!("Author:      {}", desc.author);
    println!("License:     {}", desc.license);
    if !desc.description.is_empty() {
        println!("Description: {}", desc.description);
    }
    println!("Timing:      {}", timing_summary(&desc));
    println!();
    println!("Parameters:");
    for param in desc.params() {
        let range = match (&param.minimum, &param.maximum) {
            (Some(min), Some(max)) => format!(" [{min}, {max}]"),
            (Some(min), None) => format!(" [{min}, ...]"),
            (None, Some(max)) => format!(" [..., {max}]"),
            (None, None) => String::new(),
        };
        println!(
            "  {:<12} {:<9} default {}{range}",
            param.name,
            param.kind.as_str(),
            param.default
        );
        if !param.prefix.is_empty() || !param.postfix.is_empty() {
            println!("  {:<12} label \"{} _ {}\"", "", param.prefix, param.postfix);
        }
    }
    Ok(())
}

fn timing_summary(desc: &Descriptor) -> String {
    let mut flags = vec![
        if desc.absolute_time {
            "absolute time"
        } else {
            "relative time"
        },
        if desc.repeat { "looping" } else { "one-shot" },
    ];
    if desc.preempt {
        flags.push("preempt");
    }
    if desc.live_params {
        flags.push("live params");
    }
    format!("{}, keypress: {}", flags.join(", "), desc.keypress_mode)
}
