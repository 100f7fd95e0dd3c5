use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::output::OutputLog;

/// One unit of user input after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUnit {
    Char(char),
    Enter,
    Backspace,
    /// Ctrl-C; raw mode swallows the signal, so it is surfaced as a unit.
    Interrupt,
}

/// The input queue the main loop polls without blocking.
///
/// A reader thread captures crossterm key events continuously; scripts may
/// also read from the same queue with the blocking variants.
pub struct InputSource {
    rx: mpsc::UnboundedReceiver<KeyUnit>,
}

impl InputSource {
    /// Spawn the reader thread and return the queue.
    pub fn spawn_reader() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CrosstermEvent::Key(key)) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let unit = if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        Some(KeyUnit::Interrupt)
                    } else {
                        match key.code {
                            KeyCode::Enter => Some(KeyUnit::Enter),
                            KeyCode::Backspace => Some(KeyUnit::Backspace),
                            KeyCode::Char(c) => Some(KeyUnit::Char(c)),
                            _ => None,
                        }
                    };
                    if let Some(unit) = unit {
                        if tx.send(unit).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });
        Self { rx }
    }

    /// Build from an existing channel; used by tests and by the config
    /// loader's synthetic input.
    pub fn from_receiver(rx: mpsc::UnboundedReceiver<KeyUnit>) -> Self {
        Self { rx }
    }

    /// Non-blocking poll for the next unit.
    pub fn try_next(&mut self) -> Option<KeyUnit> {
        self.rx.try_recv().ok()
    }

    /// Block until a unit arrives. `None` means the reader is gone.
    pub fn next_blocking(&mut self) -> Option<KeyUnit> {
        self.rx.blocking_recv()
    }

    /// Block until a printable character or newline arrives.
    pub fn read_char_blocking(&mut self) -> Option<char> {
        loop {
            match self.next_blocking()? {
                KeyUnit::Char(c) => return Some(c),
                KeyUnit::Enter => return Some('\n'),
                KeyUnit::Backspace | KeyUnit::Interrupt => continue,
            }
        }
    }

    /// Block until a full line is typed, echoing to `echo` as it goes.
    pub fn read_line_blocking(&mut self, echo: &mut OutputLog) -> String {
        let mut line = String::new();
        loop {
            match self.next_blocking() {
                Some(KeyUnit::Char(c)) => {
                    line.push(c);
                    echo.push_char(c);
                }
                Some(KeyUnit::Backspace) => {
                    line.pop();
                }
                Some(KeyUnit::Enter) | None => {
                    echo.line("");
                    return line;
                }
                Some(KeyUnit::Interrupt) => continue,
            }
        }
    }
}

/// Decode config-file bytes into the same units the reader thread emits.
pub fn units_from_text(text: &str) -> Vec<KeyUnit> {
    text.chars()
        .map(|c| match c {
            '\n' => KeyUnit::Enter,
            '\u{8}' | '\u{7f}' => KeyUnit::Backspace,
            c => KeyUnit::Char(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(units: &[KeyUnit]) -> InputSource {
        let (tx, rx) = mpsc::unbounded_channel();
        for unit in units {
            tx.send(*unit).unwrap();
        }
        drop(tx);
        InputSource::from_receiver(rx)
    }

    #[test]
    fn try_next_drains_in_order() {
        let mut input = source_with(&[KeyUnit::Char('a'), KeyUnit::Enter]);
        assert_eq!(input.try_next(), Some(KeyUnit::Char('a')));
        assert_eq!(input.try_next(), Some(KeyUnit::Enter));
        assert_eq!(input.try_next(), None);
    }

    #[test]
    fn read_line_collects_until_enter() {
        let mut input = source_with(&[
            KeyUnit::Char('h'),
            KeyUnit::Char('i'),
            KeyUnit::Char('!'),
            KeyUnit::Backspace,
            KeyUnit::Enter,
            KeyUnit::Char('x'),
        ]);
        let mut echo = OutputLog::default();
        assert_eq!(input.read_line_blocking(&mut echo), "hi");
        assert_eq!(input.try_next(), Some(KeyUnit::Char('x')));
    }

    #[test]
    fn read_char_maps_enter_to_newline() {
        let mut input = source_with(&[KeyUnit::Enter]);
        assert_eq!(input.read_char_blocking(), Some('\n'));
    }

    #[test]
    fn units_from_text_maps_newlines() {
        assert_eq!(
            units_from_text("a\nb"),
            [KeyUnit::Char('a'), KeyUnit::Enter, KeyUnit::Char('b')]
        );
    }
}
