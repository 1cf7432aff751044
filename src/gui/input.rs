use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

/// Everything a key press can mean to the kiosk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KioskInput {
    /// Follow the "next" binding.
    Advance,
    /// Follow the "previous" binding.
    Back,
    /// Numbered button `1`-`9`.
    Action(u8),
    /// Connect to the device.
    Connect,
    /// Drop the device connection.
    Disconnect,
    /// Leave the kiosk.
    Quit,
}

/// Maps a key press to a kiosk input. Releases and repeats map to nothing.
pub fn map_key(key: KeyEvent) -> Option<KioskInput> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') => Some(KioskInput::Advance),
        KeyCode::Left | KeyCode::Backspace => Some(KioskInput::Back),
        KeyCode::Char(c @ '1'..='9') => c
            .to_digit(10)
            .and_then(|n| u8::try_from(n).ok())
            .map(KioskInput::Action),
        KeyCode::Char('c') => Some(KioskInput::Connect),
        KeyCode::Char('d') => Some(KioskInput::Disconnect),
        KeyCode::Char('q') | KeyCode::Esc => Some(KioskInput::Quit),
        _ => None,
    }
}
