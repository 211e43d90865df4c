//! One running animation bound to a key set.
//!
//! A [`Session`] owns at most one child process. It is driven by two
//! stimuli, the host tick ([`Session::frame`]) and key events
//! ([`Session::keypress`]), and never blocks waiting for the child: output
//! is drained from the process on each call and committed to the color map
//! when a full frame block arrives.

use std::sync::Arc;
use std::time::Duration;

use anim_protocol::{
    keymap_block, params_block, ChildEvent, FrameReader, HostCommand, KeyTarget, KeypressMode,
};
use tracing::{debug, info, trace, warn};

use crate::clock::{FrameClock, Timing};
use crate::descriptor::Descriptor;
use crate::error::AnimError;
use crate::keymap::{KeyMap, KeyPos};
use crate::param::ParamValues;
use crate::process::{AnimProcess, ChildSpawner, Spawner};
use crate::sink::{ColorMap, ColorSink};

/// How long dropping a session waits for its child to exit
const DROP_KILL_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Session {
    descriptor: Descriptor,
    spawner: Arc<dyn Spawner>,
    keymap: KeyMap,
    keys: Vec<String>,
    params: ParamValues,
    clock: FrameClock,
    process: Option<Box<dyn AnimProcess>>,
    reader: FrameReader,
    colors: ColorMap,
    /// Top-left corner of the active keys; positions sent to the child are
    /// relative to it
    origin: KeyPos,
    initialized: bool,
    stopped: bool,
    frame_acked: bool,
    ever_acked: bool,
    write_failed: bool,
}

impl Session {
    /// Inert session that runs scripts as child processes.
    pub fn new(descriptor: Descriptor) -> Self {
        Self::with_spawner(descriptor, Arc::new(ChildSpawner))
    }

    pub fn with_spawner(descriptor: Descriptor, spawner: Arc<dyn Spawner>) -> Self {
        let clock = FrameClock::new(
            Timing::derive(descriptor.absolute_time, &ParamValues::new()),
            descriptor.absolute_time,
        );
        Self {
            descriptor,
            spawner,
            keymap: KeyMap::new(),
            keys: Vec::new(),
            params: ParamValues::new(),
            clock,
            process: None,
            reader: FrameReader::new(),
            colors: ColorMap::new(),
            origin: KeyPos::new(0, 0),
            initialized: false,
            stopped: false,
            frame_acked: false,
            ever_acked: false,
            write_failed: false,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Bind the key layout, the keys to animate and the parameter values.
    ///
    /// Does nothing if the descriptor has no executable path.
    pub fn init(&mut self, keymap: KeyMap, keys: Vec<String>, params: ParamValues) {
        if self.descriptor.path().is_none() {
            return;
        }
        self.stop();
        self.keymap = keymap;
        self.keys = keys;
        self.params = params;
        self.clock.set_timing(self.derive_timing());
        self.stopped = false;
        self.initialized = true;
    }

    /// Launch the child and send the keymap and parameter preamble.
    ///
    /// Any previous process is stopped first. `timestamp` becomes the clock
    /// origin.
    pub fn start(&mut self, timestamp: u64) -> Result<(), AnimError> {
        if !self.initialized {
            return Ok(());
        }
        self.stop();
        self.stopped = false;
        self.frame_acked = false;
        self.ever_acked = false;
        self.write_failed = false;
        self.reader.reset();
        self.clock.reset(timestamp);

        let Some(path) = self.descriptor.path() else {
            return Ok(());
        };
        let process = self.spawner.spawn(path)?;
        info!("Starting {}", path.display());
        self.process = Some(process);

        // Keys missing from the layout are not animated
        let active: Vec<(&str, KeyPos)> = self
            .keys
            .iter()
            .filter_map(|key| self.keymap.get(key).map(|pos| (key.as_str(), pos)))
            .collect();
        self.origin = KeyPos::new(
            active.iter().map(|(_, p)| p.x).min().unwrap_or(0),
            active.iter().map(|(_, p)| p.y).min().unwrap_or(0),
        );
        let origin = self.origin;
        let block = keymap_block(
            active
                .iter()
                .map(|(key, p)| (*key, p.x - origin.x, p.y - origin.y)),
        );

        self.send_all(&block);
        self.print_params();
        self.send(&HostCommand::BeginRun);
        Ok(())
    }

    /// Kill the child, if any, and clear the committed colors.
    ///
    /// The child is reaped in the background.
    pub fn stop(&mut self) {
        self.colors.clear();
        if let Some(process) = self.process.take() {
            debug!("Stopping {}", self.descriptor.name);
            process.kill();
        }
    }

    /// Regular per-tick entry point.
    ///
    /// Starts the child on first use. A new frame is only requested once the
    /// child answered the previous one.
    pub fn frame(&mut self, timestamp: u64) {
        self.pump();
        if !self.initialized || self.stopped {
            return;
        }
        if self.process.is_none() && !self.ensure_started(timestamp) {
            return;
        }
        if self.frame_acked || !self.clock.has_emitted() {
            self.next_frame(timestamp);
        }
        self.frame_acked = false;
    }

    /// [`Session::frame`] followed by a commit of the current colors.
    pub fn tick(&mut self, timestamp: u64, sink: &mut dyn ColorSink) {
        self.frame(timestamp);
        sink.commit(timestamp, &self.colors);
    }

    /// Restart the animation.
    ///
    /// With `allow_preempt` on a preempting script, the animation is first
    /// triggered one repeat interval in the past so it resumes mid-cycle.
    pub fn retrigger(&mut self, timestamp: u64, allow_preempt: bool) {
        if !self.initialized {
            return;
        }
        let repeat_ms = self.clock.timing().repeat_ms;
        if allow_preempt && self.descriptor.preempt && repeat_ms > 0 {
            self.trigger_at(timestamp.saturating_sub(repeat_ms as u64));
        }
        self.trigger_at(timestamp);
    }

    /// Forward a key event according to the script's keypress mode.
    pub fn keypress(&mut self, key: &str, pressed: bool, timestamp: u64) {
        if !self.initialized {
            return;
        }
        if self.process.is_none() && !self.ensure_started(timestamp) {
            return;
        }
        match self.descriptor.keypress_mode {
            KeypressMode::None => {
                if pressed {
                    self.retrigger(timestamp, false);
                }
            }
            KeypressMode::Name => {
                self.next_frame(timestamp);
                self.send(&HostCommand::Key {
                    target: KeyTarget::Name(key.to_string()),
                    pressed,
                });
            }
            KeypressMode::Position => {
                let Some(pos) = self.keymap.get(key) else {
                    return;
                };
                self.next_frame(timestamp);
                self.send(&HostCommand::Key {
                    target: KeyTarget::Position(pos.x - self.origin.x, pos.y - self.origin.y),
                    pressed,
                });
            }
        }
    }

    /// Replace the parameter values of a running live-parameter script.
    pub fn parameters(&mut self, params: ParamValues) {
        if !self.initialized || self.process.is_none() || !self.descriptor.live_params {
            return;
        }
        self.params = params;
        self.clock.set_timing(self.derive_timing());
        self.print_params();
    }

    /// Read all pending child output and apply completed frames.
    pub fn pump(&mut self) {
        let Some(process) = self.process.as_mut() else {
            return;
        };
        for line in process.poll() {
            trace!("< {line}");
            match self.reader.feed(&line) {
                Some(ChildEvent::Frame(entries)) => {
                    self.colors.extend(entries);
                    self.frame_acked = true;
                    self.ever_acked = true;
                }
                Some(ChildEvent::EndRun) => {
                    debug!("{} finished", self.descriptor.name);
                    self.stopped = true;
                    return;
                }
                None => {}
            }
        }
    }

    /// Colors from the most recent completed frames.
    pub fn colors(&self) -> &ColorMap {
        &self.colors
    }

    pub fn params(&self) -> &ParamValues {
        &self.params
    }

    pub fn timing(&self) -> Timing {
        self.clock.timing()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// A child process is attached.
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// The child reported `end run` or could not be started.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// At least one full frame arrived since the last start.
    pub fn has_received_frame(&self) -> bool {
        self.ever_acked
    }

    fn derive_timing(&self) -> Timing {
        Timing::derive(self.descriptor.absolute_time, &self.params)
    }

    fn ensure_started(&mut self, timestamp: u64) -> bool {
        if self.process.is_some() {
            return true;
        }
        match self.start(timestamp) {
            Ok(()) => self.process.is_some(),
            Err(e) => {
                warn!("Could not start {}: {e}", self.descriptor.name);
                self.stopped = true;
                false
            }
        }
    }

    fn trigger_at(&mut self, timestamp: u64) {
        if !self.ensure_started(timestamp) {
            return;
        }
        self.next_frame(timestamp);
        self.send(&HostCommand::Start);
    }

    fn next_frame(&mut self, timestamp: u64) {
        for phase in self.clock.advance(timestamp) {
            self.send(&HostCommand::Frame(phase));
        }
    }

    fn print_params(&mut self) {
        let block = params_block(
            self.params
                .iter()
                .map(|(name, value)| (name.as_str(), value.to_string())),
        );
        self.send_all(&block);
    }

    fn send_all(&mut self, commands: &[HostCommand]) {
        for command in commands {
            self.send(command);
        }
    }

    fn send(&mut self, command: &HostCommand) {
        let Some(process) = self.process.as_mut() else {
            return;
        };
        let line = command.to_string();
        trace!("> {line}");
        if let Err(e) = process.send(&line) {
            if !self.write_failed {
                warn!("{} is not accepting input: {e}", self.descriptor.name);
                self.write_failed = true;
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(process) = self.process.take() {
            process.kill_wait(DROP_KILL_TIMEOUT);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::param::ParamValue;

    #[derive(Default)]
    struct Shared {
        sent: Vec<String>,
        output: VecDeque<String>,
        spawns: usize,
        kills: usize,
        fail_spawn: bool,
    }

    struct FakeProcess(Arc<Mutex<Shared>>);

    impl AnimProcess for FakeProcess {
        fn send(&mut self, line: &str) -> io::Result<()> {
            self.0.lock().unwrap().sent.push(line.to_string());
            Ok(())
        }

        fn poll(&mut self) -> Vec<String> {
            self.0.lock().unwrap().output.drain(..).collect()
        }

        fn kill(self: Box<Self>) {
            self.0.lock().unwrap().kills += 1;
        }

        fn kill_wait(self: Box<Self>, _timeout: Duration) {
            self.0.lock().unwrap().kills += 1;
        }
    }

    struct FakeSpawner(Arc<Mutex<Shared>>);

    impl Spawner for FakeSpawner {
        fn spawn(&self, path: &Path) -> Result<Box<dyn AnimProcess>, AnimError> {
            let mut shared = self.0.lock().unwrap();
            if shared.fail_spawn {
                return Err(AnimError::Spawn {
                    path: path.to_path_buf(),
                    source: io::ErrorKind::NotFound.into(),
                });
            }
            shared.spawns += 1;
            Ok(Box::new(FakeProcess(self.0.clone())))
        }
    }

    struct Harness {
        shared: Arc<Mutex<Shared>>,
        session: Session,
    }

    impl Harness {
        fn new(extra: &[&str]) -> Self {
            let mut lines = vec![
                "guid {6E8E5D6B-3C1B-4F65-9D39-6B1E2F3A4C5D}".to_string(),
                "name Ripple".to_string(),
                "version 1.0".to_string(),
                "year 2015".to_string(),
                "author MSC".to_string(),
                "license GPLv2".to_string(),
            ];
            lines.extend(extra.iter().map(|s| s.to_string()));
            let descriptor = Descriptor::from_declarations(lines)
                .unwrap()
                .with_path("/opt/anims/ripple");
            let shared = Arc::new(Mutex::new(Shared::default()));
            let session =
                Session::with_spawner(descriptor, Arc::new(FakeSpawner(shared.clone())));
            Self { shared, session }
        }

        fn init(&mut self) {
            self.init_with(|_| {});
        }

        fn init_with(&mut self, edit: impl FnOnce(&mut ParamValues)) {
            let mut keymap = KeyMap::new();
            keymap.insert("esc", 0, 0);
            keymap.insert("f1", 24, 0);
            keymap.insert("a", 12, 36);
            let mut params = self.session.descriptor().default_values();
            edit(&mut params);
            self.session.init(
                keymap,
                vec!["f1".to_string(), "a".to_string(), "missing".to_string()],
                params,
            );
        }

        fn sent(&self) -> Vec<String> {
            self.shared.lock().unwrap().sent.clone()
        }

        /// Lines sent after the preamble
        fn after_run(&self) -> Vec<String> {
            let sent = self.sent();
            let begin = sent
                .iter()
                .position(|l| l == "begin run")
                .expect("preamble was sent");
            sent[begin + 1..].to_vec()
        }

        fn output(&self, lines: &[&str]) {
            let mut shared = self.shared.lock().unwrap();
            shared.output.extend(lines.iter().map(|s| s.to_string()));
        }

        fn ack(&self, colors: &[&str]) {
            let mut lines = vec!["begin frame"];
            lines.extend_from_slice(colors);
            lines.push("end frame");
            self.output(&lines);
        }
    }

    #[test]
    fn test_init_without_path_is_noop() {
        let desc = Descriptor::from_declarations([
            "guid {6E8E5D6B-3C1B-4F65-9D39-6B1E2F3A4C5D}",
            "name Ripple",
            "version 1",
            "year 2015",
            "author MSC",
            "license GPL",
        ])
        .unwrap();
        let mut session = Session::new(desc);
        session.init(KeyMap::default_layout(), vec!["a".to_string()], ParamValues::new());
        assert!(!session.is_initialized());
        session.frame(0);
        assert!(!session.is_running());
    }

    #[test]
    fn test_uninitialized_session_ignores_events() {
        let mut h = Harness::new(&[]);
        h.session.frame(0);
        h.session.keypress("a", true, 0);
        h.session.retrigger(0, true);
        assert!(h.session.start(0).is_ok());
        assert_eq!(h.shared.lock().unwrap().spawns, 0);
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_preamble() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.start(0).unwrap();

        let sent = h.sent();
        assert_eq!(
            sent[..5],
            ["begin keymap", "keycount 2", "key f1 12,0", "key a 0,36", "end keymap"]
        );
        assert_eq!(sent[5], "begin params");
        assert!(sent.contains(&"param duration 1".to_string()));
        assert!(sent.contains(&"param stop -1".to_string()));
        assert!(sent.contains(&"param trigger true".to_string()));
        let end = sent.iter().position(|l| l == "end params").unwrap();
        assert_eq!(end - 6, h.session.descriptor().params().len());
        assert_eq!(sent.last().unwrap(), "begin run");
        assert!(h.session.is_running());
    }

    #[test]
    fn test_params_are_encoded_in_name_order() {
        let mut h = Harness::new(&["param string label x x hi"]);
        h.init_with(|p| {
            p.insert("label".to_string(), ParamValue::Text("a b&c".to_string()));
        });
        h.session.start(0).unwrap();
        let params: Vec<String> = h
            .sent()
            .into_iter()
            .filter(|l| l.starts_with("param "))
            .collect();
        assert!(params.contains(&"param label a%20b%26c".to_string()));
        let mut sorted = params.clone();
        sorted.sort();
        assert_eq!(params, sorted);
    }

    #[test]
    fn test_frame_waits_for_ack() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.frame(0);
        assert_eq!(h.after_run(), ["frame 0"]);

        // Child has not answered yet
        h.session.frame(100);
        assert_eq!(h.after_run(), ["frame 0"]);

        h.ack(&["argb a ff00ff00"]);
        h.session.frame(250);
        assert_eq!(h.after_run(), ["frame 0", "frame 0.25"]);
        assert_eq!(h.session.colors().get("a"), Some(&0xff00_ff00));
        assert!(h.session.has_received_frame());
    }

    #[test]
    fn test_elapsed_cycles_are_flushed() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.frame(0);
        h.ack(&[]);
        h.session.frame(2500);
        assert_eq!(h.after_run(), ["frame 0", "frame 1", "frame 1", "frame 0.5"]);
    }

    #[test]
    fn test_absolute_time_sends_seconds() {
        let mut h = Harness::new(&["time absolute"]);
        assert!(h.session.descriptor().absolute_time);
        h.init();
        assert_eq!(h.session.timing().duration_ms, 1000);

        h.session.frame(0);
        h.ack(&[]);
        h.session.frame(2500);
        assert_eq!(h.after_run(), ["frame 0", "frame 2.5"]);
    }

    #[test]
    fn test_preempting_retrigger_prerolls() {
        let mut h = Harness::new(&["preempt on"]);
        assert!(h.session.descriptor().preempt);
        h.init_with(|p| {
            p.insert("repeat".to_string(), ParamValue::Real(0.5));
        });
        assert_eq!(h.session.timing().repeat_ms, 500);

        h.session.retrigger(1000, true);
        assert_eq!(h.after_run(), ["frame 0", "start", "frame 0.5", "start"]);
    }

    #[test]
    fn test_retrigger_without_preempt() {
        let mut h = Harness::new(&["preempt on"]);
        h.init();
        h.session.retrigger(1000, false);
        assert_eq!(h.after_run(), ["frame 0", "start"]);
    }

    #[test]
    fn test_keypress_without_mode_retriggers() {
        let mut by_key = Harness::new(&["preempt on"]);
        by_key.init();
        by_key.session.keypress("a", true, 1000);

        let mut direct = Harness::new(&["preempt on"]);
        direct.init();
        direct.session.retrigger(1000, false);

        assert_eq!(by_key.sent(), direct.sent());
    }

    #[test]
    fn test_key_release_without_mode_is_ignored() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.keypress("a", false, 0);
        assert!(h.session.is_running());
        assert!(h.after_run().is_empty());
    }

    #[test]
    fn test_keypress_by_name() {
        let mut h = Harness::new(&["kpmode name"]);
        h.init();
        h.session.keypress("esc", true, 0);
        h.session.keypress("esc", false, 500);
        assert_eq!(
            h.after_run(),
            ["frame 0", "key esc down", "frame 0.5", "key esc up"]
        );
    }

    #[test]
    fn test_keypress_by_position() {
        let mut h = Harness::new(&["kpmode position"]);
        h.init();
        h.session.start(0).unwrap();

        h.session.keypress("g1", true, 100);
        assert!(h.after_run().is_empty());

        // Relative to the top-left of f1/a, which is (12, 0)
        h.session.keypress("f1", true, 100);
        assert_eq!(h.after_run(), ["frame 0.1", "key 12,0 down"]);
    }

    #[test]
    fn test_end_run_stops_frames() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.frame(0);
        h.output(&["end run"]);
        h.session.frame(100);
        assert!(h.session.is_stopped());
        assert_eq!(h.after_run(), ["frame 0"]);
    }

    #[test]
    fn test_output_outside_frame_ignored() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.frame(0);
        h.output(&["argb a ffffffff", "hello"]);
        h.session.frame(100);
        assert!(h.session.colors().is_empty());
        assert!(!h.session.has_received_frame());
    }

    #[test]
    fn test_live_parameters() {
        let mut h = Harness::new(&["parammode live", "param long speed x x 1"]);
        h.init();
        h.session.frame(0);
        let mut params = h.session.params().clone();
        params.insert("speed".to_string(), ParamValue::Integer(7));
        h.session.parameters(params);

        let after = h.after_run();
        assert_eq!(after[1], "begin params");
        assert!(after.contains(&"param speed 7".to_string()));
        assert_eq!(after.last().unwrap(), "end params");
    }

    #[test]
    fn test_static_parameters_not_pushed() {
        let mut h = Harness::new(&["param long speed x x 1"]);
        h.init();
        h.session.frame(0);
        let mut params = h.session.params().clone();
        params.insert("speed".to_string(), ParamValue::Integer(7));
        h.session.parameters(params);
        assert_eq!(h.after_run(), ["frame 0"]);
        assert_eq!(h.session.params()["speed"], ParamValue::Integer(1));
    }

    #[test]
    fn test_stop_clears_colors() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.frame(0);
        h.ack(&["argb f1 ff112233"]);
        h.session.pump();
        assert_eq!(h.session.colors().len(), 1);

        h.session.stop();
        assert!(h.session.colors().is_empty());
        assert!(!h.session.is_running());
        assert_eq!(h.shared.lock().unwrap().kills, 1);
    }

    #[test]
    fn test_start_replaces_process() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.start(0).unwrap();
        h.session.start(10).unwrap();
        let shared = h.shared.lock().unwrap();
        assert_eq!(shared.spawns, 2);
        assert_eq!(shared.kills, 1);
    }

    #[test]
    fn test_spawn_failure_stops_session() {
        let mut h = Harness::new(&[]);
        h.init();
        h.shared.lock().unwrap().fail_spawn = true;
        h.session.frame(0);
        assert!(h.session.is_stopped());
        assert!(!h.session.is_running());
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_tick_commits_colors() {
        let mut h = Harness::new(&[]);
        h.init();
        let mut sink = crate::sink::LatestColors::default();
        h.session.tick(0, &mut sink);
        h.ack(&["argb a 80ff0000"]);
        h.session.tick(33, &mut sink);
        assert_eq!(sink.timestamp, 33);
        assert_eq!(sink.colors.get("a"), Some(&0x80ff_0000));
    }

    #[test]
    fn test_drop_kills_child() {
        let mut h = Harness::new(&[]);
        h.init();
        h.session.frame(0);
        let shared = h.shared.clone();
        drop(h);
        assert_eq!(shared.lock().unwrap().kills, 1);
    }
}
