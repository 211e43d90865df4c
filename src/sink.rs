//! Per-tick color output collaborator

use std::collections::BTreeMap;

/// Committed colors by key id, `0xAARRGGBB`
pub type ColorMap = BTreeMap<String, u32>;

/// Receives a session's committed colors after each tick
pub trait ColorSink {
    fn commit(&mut self, timestamp: u64, colors: &ColorMap);
}

/// Keeps only the most recent commit
#[derive(Debug, Default, Clone)]
pub struct LatestColors {
    pub timestamp: u64,
    pub colors: ColorMap,
    pub commits: usize,
}

impl ColorSink for LatestColors {
    fn commit(&mut self, timestamp: u64, colors: &ColorMap) {
        self.timestamp = timestamp;
        self.colors.clone_from(colors);
        self.commits += 1;
    }
}

/// Split an ARGB value into `(a, r, g, b)`.
pub fn argb_channels(argb: u32) -> (u8, u8, u8, u8) {
    let [a, r, g, b] = argb.to_be_bytes();
    (a, r, g, b)
}
