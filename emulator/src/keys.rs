use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub const KEY_HELP: &str =
    "keys: space/b press doorbell, l toggle sender link, r toggle receiver link, s status, q quit";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Press,
    ToggleSenderLink,
    ToggleReceiverLink,
    Status,
    Quit,
}

/// Keeps the terminal in raw mode until dropped.
pub struct RawMode(());

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn command_for(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char(' ' | 'b') => Some(Command::Press),
        KeyCode::Char('l') => Some(Command::ToggleSenderLink),
        KeyCode::Char('r') => Some(Command::ToggleReceiverLink),
        KeyCode::Char('s') => Some(Command::Status),
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

/// Waits briefly for a key and maps it to a command.
pub fn poll_command() -> io::Result<Option<Command>> {
    if !event::poll(POLL_INTERVAL)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) => Ok(command_for(key)),
        _ => Ok(None),
    }
}
