use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode};

use crate::domain::{LtvConfig, LtvError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &LtvConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, LtvError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                // While the command line is open, keys go to the line editor.
                if model.raw_keyevents() {
                    Ok(Some(Message::RawKey(key)))
                } else {
                    Ok(self.handle_key(key))
                }
            }
            Event::Resize(width, height) => {
                Ok(Some(Message::Resize(width as usize, height as usize)))
            }
            _ => Ok(None),
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('h') | KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::MoveRight),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Char('/') => Some(Message::FilterColumn),
            KeyCode::Char('r') => Some(Message::CyclePageSize),
            KeyCode::Char('c') => Some(Message::PickColumns),
            KeyCode::Char(' ') => Some(Message::Toggle),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            KeyCode::F(5) => Some(Message::Refresh),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn controller() -> Controller {
        Controller::new(&LtvConfig::default())
    }

    #[test]
    fn table_keys_map_to_messages() {
        let c = controller();
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::Char('q'))),
            Some(Message::Quit)
        ));
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::Char('j'))),
            Some(Message::MoveDown)
        ));
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::Down)),
            Some(Message::MoveDown)
        ));
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::Char('/'))),
            Some(Message::FilterColumn)
        ));
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::Char('r'))),
            Some(Message::CyclePageSize)
        ));
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::Char('c'))),
            Some(Message::PickColumns)
        ));
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::F(5))),
            Some(Message::Refresh)
        ));
    }

    #[test]
    fn copy_keys_distinguish_cell_and_row() {
        let c = controller();
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::Char('y'))),
            Some(Message::CopyCell)
        ));
        assert!(matches!(
            c.handle_key(KeyEvent::from(KeyCode::Char('Y'))),
            Some(Message::CopyRow)
        ));
    }

    #[test]
    fn unbound_keys_map_to_nothing() {
        let c = controller();
        assert!(c.handle_key(KeyEvent::from(KeyCode::Char('z'))).is_none());
        assert!(c.handle_key(KeyEvent::from(KeyCode::Tab)).is_none());
    }
}
