use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vibey_core::{
    run_matching, BackendClient, ChatSession, Config, ImageAttachment, MatchMode, MatchOutcome,
    PipelineEvent, Ticket,
};

use crate::tui::{AppEvent, TicketSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    /// Typing the path of an image to attach
    Attaching,
}

/// A single-line text field with a char-indexed cursor
#[derive(Debug, Default, Clone)]
pub struct LineInput {
    pub text: String,
    pub cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl LineInput {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

/// An image waiting to go out with the next message
pub struct PendingImage {
    pub path: String,
    pub image: ImageAttachment,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub session: ChatSession,
    pub query: LineInput,
    pub attach_path: LineInput,
    pub attachment: Option<PendingImage>,
    /// One-line notice shown in the footer until the next key press
    pub notice: Option<String>,

    // Chat scroll state
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_area: Option<Rect>,

    pub animation_frame: u8, // 0-2 for ellipsis animation

    /// Write the mode to the config file when it is toggled
    pub persist_mode: bool,
    pub backend: BackendClient,
    pub match_task: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: mpsc::UnboundedSender<AppEvent>) -> anyhow::Result<Self> {
        let backend = BackendClient::from_config(config)?;

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            session: ChatSession::new(config.mode()),
            query: LineInput::default(),
            attach_path: LineInput::default(),
            attachment: None,
            notice: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,

            persist_mode: true,
            backend,
            match_task: None,
            events,
        })
    }

    pub fn mode(&self) -> MatchMode {
        self.session.mode()
    }

    pub fn toggle_mode(&mut self) {
        let mode = self.session.toggle_mode();
        if !self.persist_mode {
            return;
        }
        if let Err(e) = Config::save_default_mode(mode) {
            tracing::warn!("Could not persist mode: {:#}", e);
        }
    }

    pub fn can_send(&self) -> bool {
        !self.query.text.trim().is_empty() || self.attachment.is_some()
    }

    /// Send the current input and attachment, starting a matching run.
    ///
    /// Any run still in flight is aborted first; the session drops its late
    /// updates by ticket.
    pub fn submit(&mut self) {
        if !self.can_send() {
            return;
        }

        let text = self.query.text.trim().to_string();
        let display_path = self.attachment.as_ref().map(|a| a.path.clone());
        let ticket = match self.session.submit(&text, display_path) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.notice = Some(e.to_string());
                return;
            }
        };

        if let Some(task) = self.match_task.take() {
            task.abort();
        }

        self.query.take();
        let image = self.attachment.take().map(|a| a.image);
        self.spawn_match(ticket, text, image);
        self.scroll_chat_to_bottom();
    }

    fn spawn_match(&mut self, ticket: Ticket, query: String, image: Option<ImageAttachment>) {
        let backend = self.backend.clone();
        let mode = self.session.active_mode();
        let tx = self.events.clone();

        self.match_task = Some(tokio::spawn(async move {
            let sink = TicketSink {
                ticket,
                tx: tx.clone(),
            };
            let result = run_matching(&backend, mode, &query, image.as_ref(), &sink).await;
            let _ = tx.send(AppEvent::MatchFinished(ticket, result));
        }));
    }

    pub fn on_pipeline_event(&mut self, ticket: Ticket, event: PipelineEvent) {
        let showed_products = matches!(event, PipelineEvent::ProductsFound(_));
        if self.session.apply(ticket, event) && showed_products {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn on_match_finished(&mut self, ticket: Ticket, result: anyhow::Result<MatchOutcome>) {
        let applied = match result {
            Ok(outcome) => self.session.complete(ticket, outcome),
            Err(e) => self.session.fail(ticket, &e),
        };

        if applied {
            self.match_task = None;
            self.scroll_chat_to_bottom();
        }
    }

    pub async fn attach_from_input(&mut self) {
        let path = self.attach_path.take();
        let path = path.trim();
        if path.is_empty() {
            return;
        }

        match ImageAttachment::from_path(std::path::Path::new(path)).await {
            Ok(image) => {
                tracing::info!(path, bytes = image.bytes.len(), "Attached image");
                self.attachment = Some(PendingImage {
                    path: path.to_string(),
                    image,
                });
                self.notice = None;
            }
            Err(e) => {
                tracing::warn!("Attach failed: {:#}", e);
                self.notice = Some(format!("{:#}", e));
            }
        }
    }

    pub fn clear_chat(&mut self) {
        if let Some(task) = self.match_task.take() {
            task.abort();
        }
        self.session.clear();
        self.chat_scroll = 0;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Rough line count of the rendered chat, used for scroll calculations
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let wrapped = |text: &str| -> u16 {
            text.lines()
                .map(|line| (line.chars().count() / wrap_width + 1) as u16)
                .sum::<u16>()
                .max(1)
        };

        let mut total_lines: u16 = 0;
        for msg in self.session.messages() {
            total_lines += 1; // Role line
            total_lines += wrapped(&msg.content);
            if msg.image.is_some() {
                total_lines += 1;
            }
            total_lines += (msg.products.len() as u16) * 2;
            total_lines += 1; // Blank line after message
        }
        total_lines
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        let total_lines = self.chat_line_count();
        if total_lines > visible_height {
            self.chat_scroll = total_lines - visible_height;
        }
    }
}
