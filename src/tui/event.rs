use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, Mode};
use crate::model::TaskId;

/// Result of handling a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    /// View settings changed; rebuild rows.
    Refresh,
    Toggle(TaskId),
    Submit,
    Continue,
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyAction {
    if app.form.is_some() {
        return handle_form(app, key);
    }
    if app.mode == Mode::Help {
        app.toggle_help();
        return KeyAction::Continue;
    }

    app.error = None;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
            KeyAction::Continue
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
            KeyAction::Continue
        }
        KeyCode::Char(' ') => {
            app.toggle_collapse();
            KeyAction::Refresh
        }
        KeyCode::Char('f') => {
            app.cycle_filter();
            KeyAction::Refresh
        }
        KeyCode::Char('x') | KeyCode::Enter => match app.selected() {
            Some(row) => KeyAction::Toggle(row.id),
            None => KeyAction::Continue,
        },
        KeyCode::Char('a') => {
            app.enter_add_mode(true);
            KeyAction::Continue
        }
        KeyCode::Char('A') => {
            app.enter_add_mode(false);
            KeyAction::Continue
        }
        KeyCode::Char('e') => {
            app.enter_edit_mode();
            KeyAction::Continue
        }
        KeyCode::Char('?') => {
            app.toggle_help();
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

fn handle_form(app: &mut App, key: KeyEvent) -> KeyAction {
    let Some(form) = &mut app.form else {
        return KeyAction::Continue;
    };
    match key.code {
        KeyCode::Esc => {
            app.cancel_form();
            KeyAction::Continue
        }
        KeyCode::Tab | KeyCode::BackTab => {
            form.switch_field();
            KeyAction::Continue
        }
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Backspace => {
            form.focused_buf_mut().pop();
            form.error = None;
            KeyAction::Continue
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            form.focused_buf_mut().clear();
            form.error = None;
            KeyAction::Continue
        }
        KeyCode::Char(c) => {
            form.focused_buf_mut().push(c);
            form.error = None;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}
