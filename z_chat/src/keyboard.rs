//! Keyboard reader feeding the chat session

use console::{Key, Term};
use zenoh_chat::{InputHandle, Submitted};

use crate::term_display::Draft;

/// What a key press asks of the reader
#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    /// The draft changed or nothing happened
    Edit,
    /// Submit the line that was being typed
    Submit(String),
    /// Stop the session
    Stop,
}

fn apply_key(draft: &mut String, key: Key) -> KeyAction {
    match key {
        Key::Char(ch) if !ch.is_control() => {
            draft.push(ch);
            KeyAction::Edit
        }
        Key::Backspace => {
            draft.pop();
            KeyAction::Edit
        }
        Key::Enter => KeyAction::Submit(std::mem::take(draft)),
        Key::Escape | Key::CtrlC => KeyAction::Stop,
        _ => KeyAction::Edit,
    }
}

fn echo_prompt(term: &Term, prompt: &str, draft: &str) {
    let written = term
        .clear_line()
        .and_then(|()| term.write_str(&format!("{}{}", prompt, draft)));
    if let Err(e) = written {
        tracing::debug!("Prompt redraw failed: {}", e);
    }
}

/// Read keys until the session stops accepting input
///
/// Runs on a plain thread: `read_key` blocks and cannot be interrupted, and a
/// detached thread does not hold up runtime shutdown.
pub fn spawn(input: InputHandle, prompt: String, draft: Draft) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let term = Term::stdout();
        loop {
            let key = match term.read_key() {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!("Keyboard read failed: {}", e);
                    let _ = input.stop();
                    break;
                }
            };
            if input.is_closed() {
                break;
            }

            let action = {
                let Ok(mut draft) = draft.lock() else {
                    break;
                };
                apply_key(&mut draft, key)
            };

            match action {
                KeyAction::Edit => {}
                KeyAction::Submit(line) => match input.submit(line) {
                    Ok(Submitted::Quit) | Err(_) => break,
                    Ok(Submitted::Queued) | Ok(Submitted::Ignored) => {}
                },
                KeyAction::Stop => {
                    let _ = input.stop();
                    break;
                }
            }

            let current = draft.lock().map(|draft| draft.clone()).unwrap_or_default();
            echo_prompt(&term, &prompt, &current);
        }
    })
}
