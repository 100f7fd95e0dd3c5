use std::collections::HashMap;
use std::path::PathBuf;

use crate::input::KeyUnit;
use crate::script::Script;

/// The character that opens command entry.
pub const COMMAND_PREFIX: char = ':';

/// What the state machine wants done with a consumed input unit.
#[derive(Debug)]
pub enum InputAction {
    /// Buffered (or ignored); nothing for the caller to do.
    None,
    /// A keybinding fired; run this script.
    RunScript(Script),
    /// A bare character with no binding.
    Unbound(char),
    /// A completed command line, prefix already stripped.
    Dispatch(String),
    /// Ctrl-C: behave like `exit`.
    Interrupt,
    /// Input arrived that no mode can accept.
    Error(String),
}

/// The input/command state machine.
///
/// Three orthogonal pieces of state: the line being typed, the multi-line
/// script capture buffer, and the pending routing flags consumed by
/// script finalization. Mutated only from the single input-handling path.
#[derive(Debug, Default)]
pub struct Terminal {
    line: String,
    script_buffer: String,
    command_being_written: bool,
    script_being_written: bool,
    pending_bind: Option<char>,
    pending_idle: bool,
    idle_script: Option<Script>,
    bindings: HashMap<char, Script>,
    macros: HashMap<String, PathBuf>,
    aliases: HashMap<String, String>,
}

impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// The line currently being typed, for the input pane.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Route one input unit through the state machine.
    pub fn handle_key(&mut self, key: KeyUnit) -> InputAction {
        match key {
            KeyUnit::Interrupt => InputAction::Interrupt,
            KeyUnit::Char(ch) => {
                if self.line.is_empty() && ch == COMMAND_PREFIX {
                    self.command_being_written = true;
                }
                if !self.command_being_written
                    && !self.script_being_written
                    && ch != COMMAND_PREFIX
                {
                    // Bare characters go to the keybinding table, never to
                    // the line buffer.
                    return match self.bindings.get(&ch) {
                        Some(script) => InputAction::RunScript(script.clone()),
                        None => InputAction::Unbound(ch),
                    };
                }
                self.line.push(ch);
                InputAction::None
            }
            KeyUnit::Backspace => {
                // Erasing back to a lone prefix abandons command entry.
                if self.line.len() == 1 && self.line.starts_with(COMMAND_PREFIX) {
                    self.command_being_written = false;
                }
                self.line.pop();
                InputAction::None
            }
            KeyUnit::Enter => {
                if self.command_being_written {
                    let command = self.line[COMMAND_PREFIX.len_utf8()..].to_string();
                    self.line.clear();
                    self.command_being_written = false;
                    InputAction::Dispatch(command)
                } else if self.script_being_written {
                    self.script_buffer.push_str(&self.line);
                    self.script_buffer.push('\n');
                    self.line.clear();
                    InputAction::None
                } else if self.line.is_empty() {
                    // A blank line outside any mode is tolerated.
                    InputAction::None
                } else {
                    let stray = std::mem::take(&mut self.line);
                    InputAction::Error(format!(
                        "non-command input '{stray}' entered before a begin command"
                    ))
                }
            }
        }
    }

    // ── Script capture ───────────────────────────────────────────────────

    pub fn script_being_written(&self) -> bool {
        self.script_being_written
    }

    /// Open the multi-line capture buffer, discarding previous contents.
    pub fn begin_script(&mut self) {
        self.script_being_written = true;
        self.script_buffer.clear();
    }

    /// Close the capture buffer and hand its contents over.
    pub fn take_script_buffer(&mut self) -> String {
        self.script_being_written = false;
        std::mem::take(&mut self.script_buffer)
    }

    pub fn cancel_script(&mut self) {
        self.script_being_written = false;
        self.script_buffer.clear();
    }

    pub fn script_buffer(&self) -> &str {
        &self.script_buffer
    }

    // ── Pending routing flags ────────────────────────────────────────────

    pub fn set_pending_bind(&mut self, ch: char) {
        self.pending_bind = Some(ch);
    }

    pub fn set_pending_idle(&mut self) {
        self.pending_idle = true;
    }

    pub fn take_pending_bind(&mut self) -> Option<char> {
        self.pending_bind.take()
    }

    pub fn take_pending_idle(&mut self) -> bool {
        std::mem::take(&mut self.pending_idle)
    }

    // ── Tables ───────────────────────────────────────────────────────────

    pub fn bind(&mut self, ch: char, script: Script) {
        self.bindings.insert(ch, script);
    }

    pub fn binding(&self, ch: char) -> Option<&Script> {
        self.bindings.get(&ch)
    }

    pub fn set_idle_script(&mut self, script: Option<Script>) {
        self.idle_script = script;
    }

    pub fn idle_script(&self) -> Option<&Script> {
        self.idle_script.as_ref()
    }

    pub fn define_macro(&mut self, name: &str, file: PathBuf) {
        self.macros.insert(name.to_string(), file);
    }

    pub fn macro_file(&self, name: &str) -> Option<&PathBuf> {
        self.macros.get(name)
    }

    pub fn define_alias(&mut self, name: &str, command: String) {
        self.aliases.insert(name.to_string(), command);
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{compile, Script};

    fn feed(term: &mut Terminal, text: &str) -> Vec<InputAction> {
        crate::input::units_from_text(text)
            .into_iter()
            .map(|unit| term.handle_key(unit))
            .collect()
    }

    fn script(source: &str) -> Script {
        Script::new(None, source.to_string(), compile(source).unwrap())
    }

    #[test]
    fn colon_enters_command_mode_and_buffers() {
        let mut term = Terminal::new();
        feed(&mut term, ":ex");
        assert_eq!(term.line(), ":ex");
    }

    #[test]
    fn enter_dispatches_command_without_prefix() {
        let mut term = Terminal::new();
        let actions = feed(&mut term, ":echo hi\n");
        match actions.last().unwrap() {
            InputAction::Dispatch(cmd) => assert_eq!(cmd, "echo hi"),
            other => panic!("expected dispatch, got {other:?}"),
        }
        assert_eq!(term.line(), "");
    }

    #[test]
    fn bare_character_consults_bindings() {
        let mut term = Terminal::new();
        term.bind('p', script("play_selected"));
        match term.handle_key(KeyUnit::Char('p')) {
            InputAction::RunScript(s) => assert_eq!(s.source(), "play_selected"),
            other => panic!("expected script, got {other:?}"),
        }
        match term.handle_key(KeyUnit::Char('q')) {
            InputAction::Unbound('q') => {}
            other => panic!("expected unbound, got {other:?}"),
        }
        // Neither consulted character reaches the line buffer.
        assert_eq!(term.line(), "");
    }

    #[test]
    fn backspace_to_lone_colon_leaves_command_mode() {
        let mut term = Terminal::new();
        feed(&mut term, ":a");
        term.handle_key(KeyUnit::Backspace);
        term.handle_key(KeyUnit::Backspace);
        assert_eq!(term.line(), "");
        // 'x' must go to the binding table again, not the buffer.
        assert!(matches!(
            term.handle_key(KeyUnit::Char('x')),
            InputAction::Unbound('x')
        ));
    }

    #[test]
    fn script_capture_accumulates_lines() {
        let mut term = Terminal::new();
        term.begin_script();
        feed(&mut term, "select_down\nplay_selected\n");
        assert_eq!(term.script_buffer(), "select_down\nplay_selected\n");
        assert!(term.script_being_written());
    }

    #[test]
    fn command_lines_still_dispatch_during_capture() {
        let mut term = Terminal::new();
        term.begin_script();
        let actions = feed(&mut term, ":end named\n");
        assert!(matches!(
            actions.last().unwrap(),
            InputAction::Dispatch(cmd) if cmd == "end named"
        ));
        // The :end line itself never lands in the script buffer.
        assert_eq!(term.script_buffer(), "");
    }

    #[test]
    fn take_script_buffer_closes_capture() {
        let mut term = Terminal::new();
        term.begin_script();
        feed(&mut term, "x\n");
        assert_eq!(term.take_script_buffer(), "x\n");
        assert!(!term.script_being_written());
        assert_eq!(term.script_buffer(), "");
    }

    #[test]
    fn stray_text_before_begin_is_an_error() {
        // Cancelling mid-line leaves buffered text in no mode at all;
        // submitting it must be rejected, not silently dispatched.
        let mut term = Terminal::new();
        term.begin_script();
        feed(&mut term, "abc");
        term.cancel_script();
        assert!(matches!(
            term.handle_key(KeyUnit::Enter),
            InputAction::Error(_)
        ));
        assert_eq!(term.line(), "");
    }

    #[test]
    fn blank_line_outside_modes_is_tolerated() {
        let mut term = Terminal::new();
        assert!(matches!(term.handle_key(KeyUnit::Enter), InputAction::None));
    }

    #[test]
    fn interrupt_passes_through() {
        let mut term = Terminal::new();
        assert!(matches!(
            term.handle_key(KeyUnit::Interrupt),
            InputAction::Interrupt
        ));
    }

    #[test]
    fn pending_flags_are_taken_once() {
        let mut term = Terminal::new();
        term.set_pending_bind('a');
        term.set_pending_idle();
        assert_eq!(term.take_pending_bind(), Some('a'));
        assert_eq!(term.take_pending_bind(), None);
        assert!(term.take_pending_idle());
        assert!(!term.take_pending_idle());
    }
}
