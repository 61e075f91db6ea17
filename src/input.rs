use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Line editor for the bottom command line. Collects keystrokes while the
/// model is in input modus; `finished`/`canceled` tell the model what to do
/// with the text.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.enter(),
            (KeyCode::Esc, KeyModifiers::NONE) => self.escape(),
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.left(),
            (KeyCode::Right, KeyModifiers::NONE) => self.right(),
            (kc, km) => self.key(kc, km),
        }
    }

    /// Prefill the line, cursor at the end. Used to edit an existing filter.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor_pos = self.current_input.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            cursor_pos: self.cursor_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        trace!("Input finished: {}", self.current_input);
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let pos = self.byte_pos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor_pos < self.current_input.chars().count() {
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn key(&mut self, code: KeyCode, _modifier: KeyModifiers) -> InputResult {
        if let Some(chr) = code.as_char() {
            let pos = self.byte_pos();
            self.current_input.insert(pos, chr);
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn type_text(inputter: &mut Inputter, text: &str) {
        for c in text.chars() {
            inputter.read(KeyEvent::from(KeyCode::Char(c)));
        }
    }

    #[test]
    fn typed_text_finishes_on_enter() {
        let mut inputter = Inputter::default();
        type_text(&mut inputter, "beauty");
        let result = inputter.read(KeyEvent::from(KeyCode::Enter));
        assert_eq!(result.input, "beauty");
        assert!(result.finished);
        assert!(!result.canceled);
    }

    #[test]
    fn escape_cancels_and_drops_the_text() {
        let mut inputter = Inputter::default();
        type_text(&mut inputter, "groceries");
        let result = inputter.read(KeyEvent::from(KeyCode::Esc));
        assert!(result.finished);
        assert!(result.canceled);
        assert_eq!(result.input, "");
    }

    #[test]
    fn prefill_puts_cursor_at_the_end() {
        let mut inputter = Inputter::default();
        inputter.set("beau");
        type_text(&mut inputter, "ty");
        assert_eq!(inputter.get().input, "beauty");
        assert_eq!(inputter.get().cursor_pos, 6);
    }

    #[test]
    fn backspace_removes_before_the_cursor() {
        let mut inputter = Inputter::default();
        type_text(&mut inputter, "abc");
        inputter.read(KeyEvent::from(KeyCode::Left));
        inputter.read(KeyEvent::from(KeyCode::Backspace));
        assert_eq!(inputter.get().input, "ac");
        assert_eq!(inputter.get().cursor_pos, 1);
    }

    #[test]
    fn insert_in_the_middle() {
        let mut inputter = Inputter::default();
        type_text(&mut inputter, "bt");
        inputter.read(KeyEvent::from(KeyCode::Left));
        type_text(&mut inputter, "ea");
        let result = inputter.read(KeyEvent::from(KeyCode::Enter));
        assert_eq!(result.input, "beat");
    }
}
