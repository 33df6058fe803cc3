//! Terminal rendering of a chat session
//!
//! Screen layout, redrawn as a whole:
//!
//! ```text
//! Room: lobby                        │ Peers
//! <bob>: hi                          │ 4f1c9a2e
//! <alice>: hello                     │ 9d0b77c1
//! ...                                │
//! alice > draft being typed
//! ```

use std::sync::{Arc, Mutex};

use console::{pad_str, style, truncate_str, Alignment, Term};
use zenoh_chat::{ChatError, ChatLine, DisplaySink, LineOrigin};

/// Width of the peer panel on the right
pub const PEER_PANEL_WIDTH: usize = 20;

/// Messages kept for scrollback
const HISTORY_LIMIT: usize = 1000;

/// Text typed but not yet submitted, shared with the keyboard reader
pub type Draft = Arc<Mutex<String>>;

/// Everything needed to compose one frame
pub struct Frame<'a> {
    pub width: usize,
    pub height: usize,
    pub room_name: &'a str,
    pub status: Option<&'a str>,
    pub lines: &'a [ChatLine],
    pub peers: &'a [String],
    pub prompt: &'a str,
    pub draft: &'a str,
}

impl Frame<'_> {
    /// Compose the frame into exactly `height` rows
    pub fn compose(&self) -> Vec<String> {
        let height = self.height.max(3);
        let message_width = self.width.saturating_sub(PEER_PANEL_WIDTH + 1).max(1);
        let body_height = height - 2;

        let mut rows = Vec::with_capacity(height);

        let mut header = format!("Room: {}", self.room_name);
        if let Some(status) = self.status {
            header = format!("{}  {}", header, style(status).red());
        }
        rows.push(fit(&style(header).bold().to_string(), message_width) + &panel_cell("Peers"));

        let visible = &self.lines[self.lines.len().saturating_sub(body_height)..];
        for row in 0..body_height {
            let message = visible.get(row).map(render_line).unwrap_or_default();
            let peer = self.peers.get(row).map(String::as_str).unwrap_or("");
            rows.push(fit(&message, message_width) + &panel_cell(peer));
        }

        let input = format!("{}{}", self.prompt, self.draft);
        rows.push(truncate_str(&input, self.width.max(1), "").into_owned());
        rows
    }
}

fn render_line(line: &ChatLine) -> String {
    let prompt = format!("<{}>:", line.nick);
    let prompt = match line.origin {
        LineOrigin::Remote => style(prompt).green(),
        LineOrigin::Local => style(prompt).yellow(),
    };
    format!("{} {}", prompt, line.text)
}

fn fit(text: &str, width: usize) -> String {
    let text = truncate_str(text, width, "…");
    pad_str(&text, width, Alignment::Left, None).into_owned()
}

fn panel_cell(text: &str) -> String {
    format!("│{}", fit(text, PEER_PANEL_WIDTH))
}

/// Display sink drawing the whole chat screen on a terminal
pub struct TermDisplay {
    term: Term,
    room_name: String,
    prompt: String,
    draft: Draft,
    lines: Vec<ChatLine>,
    peers: Vec<String>,
    status: Option<String>,
}

impl TermDisplay {
    pub fn new(term: Term, room_name: &str, nickname: &str, draft: Draft) -> Self {
        Self {
            term,
            room_name: room_name.to_string(),
            prompt: prompt_for(nickname),
            draft,
            lines: Vec::new(),
            peers: Vec::new(),
            status: None,
        }
    }
}

/// Input prompt shown in front of the draft
pub fn prompt_for(nickname: &str) -> String {
    format!("{} > ", nickname)
}

impl DisplaySink for TermDisplay {
    fn append_line(&mut self, line: ChatLine) {
        self.lines.push(line);
        if self.lines.len() > HISTORY_LIMIT {
            let excess = self.lines.len() - HISTORY_LIMIT;
            self.lines.drain(..excess);
        }
    }

    fn set_peers(&mut self, labels: Vec<String>) {
        self.peers = labels;
    }

    fn report_error(&mut self, error: &ChatError) {
        self.status = Some(format!("publish error: {}", error));
    }

    fn redraw(&mut self) -> std::io::Result<()> {
        let (rows, cols) = self.term.size();
        let draft = self
            .draft
            .lock()
            .map(|draft| draft.clone())
            .unwrap_or_default();
        let frame = Frame {
            width: cols as usize,
            height: rows as usize,
            room_name: &self.room_name,
            status: self.status.as_deref(),
            lines: &self.lines,
            peers: &self.peers,
            prompt: &self.prompt,
            draft: &draft,
        };
        let screen = frame.compose();

        self.term.move_cursor_to(0, 0)?;
        let last = screen.len() - 1;
        for (index, row) in screen.iter().enumerate() {
            self.term.clear_line()?;
            if index == last {
                self.term.write_str(row)?;
            } else {
                self.term.write_line(row)?;
            }
        }
        self.term.flush()
    }
}
