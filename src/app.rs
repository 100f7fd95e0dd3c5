use std::path::Path;

use tokio::sync::mpsc;

use crate::browse::tree::DirTree;
use crate::config::Config;
use crate::input::{units_from_text, InputSource, KeyUnit};
use crate::output::OutputLog;
use crate::playback::PlaybackSupervisor;
use crate::script::host::ScriptHost;
use crate::script::Script;
use crate::terminal::{InputAction, Terminal};

/// Application state and the control flow tying the pieces together.
///
/// Owned by the main loop; every mutation funnels through [`App::handle_key`]
/// or [`App::tick`] on the one control thread.
pub struct App {
    pub config: Config,
    pub tree: DirTree,
    pub terminal: Terminal,
    pub player: PlaybackSupervisor,
    /// Command and script output.
    pub log: OutputLog,
    /// The external player's stdout.
    pub player_log: OutputLog,
    pub input: InputSource,
    player_out_rx: mpsc::UnboundedReceiver<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, tree: DirTree, input: InputSource) -> Self {
        let (player_out_tx, player_out_rx) = mpsc::unbounded_channel();
        let player = PlaybackSupervisor::new(
            config.player.clone(),
            config.quit_directive.clone(),
            player_out_tx,
        );
        Self {
            config,
            tree,
            terminal: Terminal::new(),
            player,
            log: OutputLog::default(),
            player_log: OutputLog::default(),
            input,
            player_out_rx,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// One main-loop iteration of background work: refresh playback state,
    /// drain the player's output, consume queued input, and run the idle
    /// hook while nothing is playing.
    pub fn tick(&mut self) {
        self.player.sync();
        while let Ok(line) = self.player_out_rx.try_recv() {
            self.player_log.line(line);
        }
        while let Some(unit) = self.input.try_next() {
            self.handle_key(unit);
            if self.should_quit {
                return;
            }
        }
        if !self.player.in_progress() {
            self.run_idle_script();
        }
    }

    /// Route one input unit through the terminal state machine and act on
    /// the outcome.
    pub fn handle_key(&mut self, unit: KeyUnit) {
        match self.terminal.handle_key(unit) {
            InputAction::None => {}
            InputAction::RunScript(script) => self.run_script(&script, true),
            InputAction::Unbound(ch) => {
                self.log.line(format!("'{ch}' is not bound"));
            }
            InputAction::Dispatch(command) => {
                if let Err(e) = self.dispatch_command(&command) {
                    self.log.line(e.to_string());
                }
            }
            InputAction::Interrupt => self.should_quit = true,
            InputAction::Error(message) => self.log.line(message),
        }
    }

    /// Replay a command file through the input pipeline, as if typed.
    pub fn run_command_file(&mut self, path: &Path) -> crate::error::Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.feed_text(&text);
        Ok(())
    }

    pub fn feed_text(&mut self, text: &str) {
        for unit in units_from_text(text) {
            self.handle_key(unit);
            if self.should_quit {
                return;
            }
        }
    }

    /// Route a finalized script: a pending `bind` and a pending
    /// `on_no_playback` each claim it; only an unclaimed script runs
    /// immediately.
    pub fn manage_script(&mut self, script: Script) {
        let mut claimed = false;
        if let Some(ch) = self.terminal.take_pending_bind() {
            self.log
                .line(format!("bound '{ch}' to {}", script.display_name()));
            self.terminal.bind(ch, script.clone());
            claimed = true;
        }
        if self.terminal.take_pending_idle() {
            if script.is_empty() {
                self.log.line("cleared the idle script");
                self.terminal.set_idle_script(None);
            } else {
                self.log
                    .line(format!("idle script is now {}", script.display_name()));
                self.terminal.set_idle_script(Some(script.clone()));
            }
            claimed = true;
        }
        if !claimed {
            self.run_script(&script, true);
        }
    }

    /// Run a script against the live state, logging failures.
    pub fn run_script(&mut self, script: &Script, announce: bool) {
        if announce {
            self.log.line(format!("running {}", script.display_name()));
        }
        let mut host = ScriptHost {
            tree: &mut self.tree,
            player: &mut self.player,
            log: &mut self.log,
            input: &mut self.input,
        };
        if let Err(e) = script.run(&mut host) {
            self.log
                .line(format!("script {} failed: {e}", script.display_name()));
        }
    }

    /// Run the idle hook once, unannounced. A failing hook is dropped so
    /// the error does not repeat every tick.
    fn run_idle_script(&mut self) {
        let Some(script) = self.terminal.idle_script().cloned() else {
            return;
        };
        let mut host = ScriptHost {
            tree: &mut self.tree,
            player: &mut self.player,
            log: &mut self.log,
            input: &mut self.input,
        };
        if let Err(e) = script.run(&mut host) {
            self.log
                .line(format!("idle script failed and was cleared: {e}"));
            self.terminal.set_idle_script(None);
        }
    }

    /// Stop playback and release resources before the terminal is restored.
    pub fn shutdown(&mut self) {
        self.player.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browse::array::BrowseArray;
    use std::fs::{self, File};
    use tempfile::TempDir;

    /// root(0) > sub(1) > b.mp3(2), a.mp3(3)
    fn app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.mp3")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub").join("b.mp3")).unwrap();
        let array = BrowseArray::build(dir.path(), &["mp3".to_string()]).unwrap();

        let (_tx, rx) = mpsc::unbounded_channel();
        let mut config = Config::default();
        config.player = vec!["true".into()];
        let app = App::new(config, DirTree::new(array), InputSource::from_receiver(rx));
        (dir, app)
    }

    #[test]
    fn unbound_key_is_reported() {
        let (_dir, mut app) = app();
        app.handle_key(KeyUnit::Char('q'));
        assert_eq!(app.log.tail(1), ["'q' is not bound"]);
    }

    #[test]
    fn typed_command_runs() {
        let (_dir, mut app) = app();
        app.feed_text(":echo hello\n");
        assert_eq!(app.log.tail(1), ["hello"]);
    }

    #[test]
    fn interrupt_quits() {
        let (_dir, mut app) = app();
        app.handle_key(KeyUnit::Interrupt);
        assert!(app.should_quit());
    }

    #[test]
    fn immediate_script_runs_on_end() {
        let (_dir, mut app) = app();
        app.feed_text(":begin\nselect_index(3)\n:end\n");
        assert_eq!(app.tree.current_index(), 3);
    }

    #[test]
    fn bind_claims_the_next_script_without_running_it() {
        let (_dir, mut app) = app();
        app.feed_text(":bind s\n:begin\nselect_index(3)\n:end\n");
        // Claimed by the binding, not executed.
        assert_eq!(app.tree.current_index(), 0);
        assert!(app.terminal.binding('s').is_some());
        app.handle_key(KeyUnit::Char('s'));
        assert_eq!(app.tree.current_index(), 3);
    }

    #[test]
    fn bind_accepts_scripts_that_only_compile() {
        let (_dir, mut app) = app();
        // `x` names no host function; binding must still succeed because
        // names resolve at run time.
        app.feed_text(":bind x\n:begin\nx\n:end\n");
        let bound = app.terminal.binding('x').unwrap();
        assert_eq!(bound.name(), "");
        assert_eq!(bound.source(), "x\n");
        app.handle_key(KeyUnit::Char('x'));
        let joined = app.log.tail(1).join("");
        assert!(joined.contains("unknown function"), "{joined}");
    }

    #[test]
    fn parse_failure_leaves_the_bind_pending() {
        let (_dir, mut app) = app();
        app.feed_text(":bind y\n:begin\nprint(\"broken\n:end\n");
        assert!(app.terminal.binding('y').is_none());
        // A later well-formed script still satisfies the pending bind.
        app.feed_text(":begin\nselect_down\n:end\n");
        assert!(app.terminal.binding('y').is_some());
    }

    #[test]
    fn on_no_playback_installs_idle_script() {
        let (_dir, mut app) = app();
        app.feed_text(":on_no_playback\n:begin\nselect_index(1)\n:end\n");
        assert!(app.terminal.idle_script().is_some());
        // Nothing playing, so a tick runs the hook once.
        app.tick();
        assert_eq!(app.tree.current_index(), 1);
    }

    #[test]
    fn empty_script_clears_idle_hook() {
        let (_dir, mut app) = app();
        app.feed_text(":on_no_playback\n:begin\nselect_down\n:end\n");
        assert!(app.terminal.idle_script().is_some());
        app.feed_text(":on_no_playback\n:begin\n:end\n");
        assert!(app.terminal.idle_script().is_none());
    }

    #[test]
    fn failing_idle_script_is_cleared() {
        let (_dir, mut app) = app();
        app.feed_text(":on_no_playback\n:begin\nno_such_function\n:end\n");
        app.tick();
        assert!(app.terminal.idle_script().is_none());
        let before = app.log.len();
        app.tick();
        assert_eq!(app.log.len(), before);
    }

    #[test]
    fn named_script_announces_by_name() {
        let (_dir, mut app) = app();
        app.feed_text(":begin\nselect_down\n:end walk\n");
        let lines = app.log.tail(5).join("\n");
        assert!(lines.contains("running walk"), "{lines}");
    }

    #[test]
    fn command_file_replays_as_keystrokes() {
        let (dir, mut app) = app();
        let file = dir.path().join("startup");
        fs::write(&file, ":echo from file\n").unwrap();
        app.run_command_file(&file).unwrap();
        assert_eq!(app.log.tail(1), ["from file"]);
    }
}
