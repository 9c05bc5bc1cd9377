use crossterm::event::KeyCode;

const BUTTON_KEYS: [char; 10] = ['1', '2', '3', '4', '5', '6', '7', '8', '9', '0'];

pub fn button_key_char(button: usize) -> char
{
    BUTTON_KEYS.get(button).copied().unwrap_or('?')
}

/// Maps a key to a button index, rejecting buttons past `button_count`.
pub fn button_for_key(code: KeyCode, button_count: usize) -> Option<usize>
{
    let KeyCode::Char(ch) = code else {
        return None;
    };
    BUTTON_KEYS
        .iter()
        .take(button_count)
        .position(|&key| key == ch)
}
