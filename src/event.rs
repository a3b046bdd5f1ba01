//! Key handling.

use crate::app::App;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Apply one key press.
///
/// # Returns
/// - `Ok(true)` - quit
/// - `Ok(false)` - keep running
pub fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => return Ok(true),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(ch) => app.push_char(ch),
        _ => {}
    }
    Ok(false)
}
