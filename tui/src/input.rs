//! Terminal input for the ofti TUI.
//!
//! A blocking thread polls crossterm and feeds a bounded channel; the frame
//! loop drains a bounded number of events per frame with [`handle_events`].

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tokio::time;

use ofti_engine::{App, Key};

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(25); // shutdown responsiveness
const INPUT_CHANNEL_CAPACITY: usize = 1024;
const MAX_EVENTS_PER_FRAME: usize = 64;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

enum InputMsg {
    Event(Event),
    Error(String),
}

pub struct InputPump {
    rx: mpsc::Receiver<InputMsg>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl InputPump {
    /// Starts the poll thread. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = Arc::clone(&stop);

        let join = task::spawn_blocking(move || input_loop(&stop2, &tx));
        Self {
            rx,
            stop,
            join: Some(join),
        }
    }

    /// Stops the poll thread and waits for it to exit.
    ///
    /// Call this before handing the terminal to another program, otherwise
    /// the poll thread competes with it for key presses.
    pub async fn shutdown(&mut self) {
        self.rx.close();
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take()
            && time::timeout(SHUTDOWN_TIMEOUT, join).await.is_err()
        {
            tracing::warn!("Input thread did not stop in time");
        }
    }
}

impl Default for InputPump {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        // Do not block in Drop.
        self.rx.close();
        self.stop.store(true, Ordering::Release);
    }
}

fn input_loop(stop: &AtomicBool, tx: &mpsc::Sender<InputMsg>) {
    while !stop.load(Ordering::Acquire) {
        match event::poll(INPUT_POLL_TIMEOUT) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    // Backpressure instead of dropping events.
                    if tx.blocking_send(InputMsg::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                break;
            }
        }
    }
}

/// Applies queued input to `app`. Returns true once the app wants to quit.
pub fn handle_events(app: &mut App, input: &mut InputPump) -> Result<bool> {
    let mut processed = 0;
    while processed < MAX_EVENTS_PER_FRAME {
        let ev = match input.rx.try_recv() {
            Ok(InputMsg::Event(ev)) => ev,
            Ok(InputMsg::Error(msg)) => return Err(anyhow!("input error: {msg}")),
            Err(mpsc::error::TryRecvError::Empty) => break,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                return Err(anyhow!("input pump disconnected"));
            }
        };
        apply_event(app, ev);
        if app.should_quit() {
            return Ok(true);
        }
        processed += 1;
    }
    Ok(app.should_quit())
}

fn apply_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) => {
            if let Some(key) = key_from_event(key) {
                app.handle_key(key);
            }
        }
        Event::Paste(text) => app.handle_paste(&single_line(&text)),
        _ => {}
    }
}

/// Text fields are single-line; pasted line breaks become spaces.
fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Maps a crossterm key press to an engine key. Releases and unsupported
/// chords map to `None`.
#[must_use]
pub fn key_from_event(key: KeyEvent) -> Option<Key> {
    if matches!(key.kind, KeyEventKind::Release) {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c' | 'C') => Some(Key::CtrlC),
            KeyCode::Char('u' | 'U') => Some(Key::CtrlU),
            KeyCode::Char('w' | 'W') => Some(Key::CtrlW),
            _ => None,
        };
    }
    let mapped = match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::F(n) => Key::F(n),
        _ => return None,
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
    use ofti_engine::Key;

    use super::{key_from_event, single_line};

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_keys_map_directly() {
        assert_eq!(
            key_from_event(press(KeyCode::Char('j'), KeyModifiers::NONE)),
            Some(Key::Char('j'))
        );
        assert_eq!(
            key_from_event(press(KeyCode::Char('G'), KeyModifiers::SHIFT)),
            Some(Key::Char('G'))
        );
        assert_eq!(
            key_from_event(press(KeyCode::F(1), KeyModifiers::NONE)),
            Some(Key::F(1))
        );
        assert_eq!(
            key_from_event(press(KeyCode::PageDown, KeyModifiers::NONE)),
            Some(Key::PageDown)
        );
    }

    #[test]
    fn control_chords() {
        assert_eq!(
            key_from_event(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Key::CtrlC)
        );
        assert_eq!(
            key_from_event(press(KeyCode::Char('w'), KeyModifiers::CONTROL)),
            Some(Key::CtrlW)
        );
        assert_eq!(
            key_from_event(press(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn releases_are_ignored() {
        let mut key = press(KeyCode::Enter, KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(key_from_event(key), None);
    }

    #[test]
    fn pasted_newlines_become_spaces() {
        assert_eq!(single_line("a\r\nb\nc\rd"), "a b c d");
    }
}
