use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks the chat to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Submit,
    Newline,
    UseTemplate,
    Quit,
    ScrollUp,
    ScrollDown,
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

/// Translate a terminal key event into a chat command.
///
/// Enter sends; Shift+Enter inserts a newline instead.
pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    let command = match key.code {
        KeyCode::Enter if shift => Command::Newline,
        KeyCode::Enter => Command::Submit,
        KeyCode::Esc => Command::Quit,
        KeyCode::Char('c') if ctrl => Command::Quit,
        KeyCode::Char('t') if ctrl => Command::UseTemplate,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(c) => Command::Insert(c),
        KeyCode::Backspace => Command::Backspace,
        KeyCode::Delete => Command::Delete,
        KeyCode::Left => Command::Left,
        KeyCode::Right => Command::Right,
        KeyCode::Home => Command::Home,
        KeyCode::End => Command::End,
        KeyCode::PageUp => Command::ScrollUp,
        KeyCode::PageDown => Command::ScrollDown,
        _ => return None,
    };
    Some(command)
}
