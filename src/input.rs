use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// The three things a keypress can mean to a typing session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Type(char),
    Delete,
    /// move to the next word, or finish on the last one
    Advance,
}

/// Map a terminal key to a session action. Keys with no typing meaning
/// (arrows, control chords, escape) map to `None` and are left to the UI.
///
/// Windows terminals report AltGr as Ctrl+Alt, so a character carrying both
/// modifiers is still typed; that is how `@`, `{` or `€` arrive on many
/// non-US layouts.
pub fn action_for_key(key: KeyEvent) -> Option<InputAction> {
    let chord = KeyModifiers::CONTROL | KeyModifiers::ALT;
    let alt_gr = key.modifiers.contains(chord) && matches!(key.code, KeyCode::Char(_));
    if key.modifiers.intersects(chord) && !alt_gr {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => Some(InputAction::Advance),
        KeyCode::Char(c) => Some(InputAction::Type(c)),
        KeyCode::Backspace => Some(InputAction::Delete),
        _ => None,
    }
}
