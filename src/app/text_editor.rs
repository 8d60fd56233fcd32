use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Single-line text field with a cursor, used by dialogs and the table filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    /// Byte offset, always on a char boundary
    cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of chars before the cursor, for placing the terminal cursor
    pub fn cursor_column(&self) -> usize {
        self.value[..self.cursor].chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Same length as the value with every char replaced, for secrets
    pub fn masked(&self) -> String {
        "•".repeat(self.value.chars().count())
    }

    fn prev_boundary(&self, pos: usize) -> usize {
        self.value[..pos]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self, pos: usize) -> usize {
        self.value[pos..]
            .chars()
            .next()
            .map(|c| pos + c.len_utf8())
            .unwrap_or(pos)
    }

    /// Apply an editing key. Returns true if the event was handled.
    pub fn handle_key(&mut self, event: KeyEvent) -> bool {
        let pos = self.cursor.min(self.value.len());

        match event.code {
            KeyCode::Char(c) => {
                if event.modifiers.contains(KeyModifiers::CONTROL) {
                    match c {
                        'u' => {
                            // Clear to start
                            self.value.drain(..pos);
                            self.cursor = 0;
                        }
                        'k' => {
                            self.value.truncate(pos);
                        }
                        'a' => self.cursor = 0,
                        'e' => self.cursor = self.value.len(),
                        'w' => {
                            // Delete word before cursor
                            let start = self.value[..pos]
                                .trim_end()
                                .rfind(char::is_whitespace)
                                .map(|i| i + 1)
                                .unwrap_or(0);
                            self.value.drain(start..pos);
                            self.cursor = start;
                        }
                        _ => return false,
                    }
                } else {
                    self.value.insert(pos, c);
                    self.cursor = pos + c.len_utf8();
                }
                true
            }
            KeyCode::Backspace => {
                if pos > 0 {
                    let start = self.prev_boundary(pos);
                    self.value.drain(start..pos);
                    self.cursor = start;
                }
                true
            }
            KeyCode::Delete => {
                if pos < self.value.len() {
                    let end = self.next_boundary(pos);
                    self.value.drain(pos..end);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.prev_boundary(pos);
                true
            }
            KeyCode::Right => {
                self.cursor = self.next_boundary(pos);
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.value.len();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn typed(text: &str) -> TextInput {
        let mut input = TextInput::default();
        for c in text.chars() {
            input.handle_key(key(KeyCode::Char(c)));
        }
        input
    }

    #[test]
    fn typing_and_cursor_movement() {
        let mut input = typed("helo");
        input.handle_key(key(KeyCode::Left));
        input.handle_key(key(KeyCode::Char('l')));
        assert_eq!(input.value(), "hello");
        assert_eq!(input.cursor_column(), 4);

        input.handle_key(key(KeyCode::Home));
        input.handle_key(key(KeyCode::Delete));
        assert_eq!(input.value(), "ello");
        input.handle_key(key(KeyCode::End));
        input.handle_key(key(KeyCode::Backspace));
        assert_eq!(input.value(), "ell");
    }

    #[test]
    fn multibyte_chars_are_edited_whole() {
        let mut input = typed("žluť");
        input.handle_key(key(KeyCode::Backspace));
        assert_eq!(input.value(), "žlu");
        input.handle_key(key(KeyCode::Home));
        input.handle_key(key(KeyCode::Right));
        assert_eq!(input.cursor_column(), 1);
        input.handle_key(key(KeyCode::Backspace));
        assert_eq!(input.value(), "lu");
    }

    #[test]
    fn control_shortcuts() {
        let mut input = typed("in.c-main users");
        input.handle_key(ctrl('w'));
        assert_eq!(input.value(), "in.c-main ");
        input.handle_key(ctrl('a'));
        input.handle_key(ctrl('k'));
        assert!(input.is_empty());
        assert!(!input.handle_key(ctrl('x')));
    }

    #[test]
    fn masked_hides_content() {
        let input = TextInput::new("secret");
        assert_eq!(input.masked().chars().count(), 6);
        assert!(!input.masked().contains('s'));
    }
}
