use anyhow::Result;
use crossterm::{
    event::{
        self, Event, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::chat::{completion, ChatController, Submission};
use crate::error::ChatError;
use crate::tui::{
    keys::{command_for_key, Command},
    ui::render_ui,
};

const SCROLL_STEP: u16 = 5;

/// Whether the event loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive chat: the controller plus terminal-only view state.
pub struct ChatApp {
    controller: ChatController,

    // Lines scrolled up from the bottom; 0 follows new entries
    scroll_back: u16,

    // Completions run on their own task and report back here
    results_tx: UnboundedSender<Result<String, ChatError>>,
    results_rx: UnboundedReceiver<Result<String, ChatError>>,
}

impl ChatApp {
    pub fn new(controller: ChatController) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            scroll_back: 0,
            results_tx,
            results_rx,
        }
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    pub fn scroll_back(&self) -> u16 {
        self.scroll_back
    }

    /// Apply one command from the keyboard.
    pub fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Quit => return Flow::Quit,
            Command::Submit => self.submit(),
            Command::UseTemplate => self.controller.use_template(),
            Command::ScrollUp => self.scroll_back = self.scroll_back.saturating_add(SCROLL_STEP),
            Command::ScrollDown => self.scroll_back = self.scroll_back.saturating_sub(SCROLL_STEP),
            Command::Newline => self.controller.edit(|input| input.newline()),
            Command::Insert(c) => self.controller.edit(|input| input.insert(c)),
            Command::Backspace => self.controller.edit(|input| input.backspace()),
            Command::Delete => self.controller.edit(|input| input.delete()),
            Command::Left => self.controller.edit(|input| input.move_left()),
            Command::Right => self.controller.edit(|input| input.move_right()),
            Command::Home => self.controller.edit(|input| input.move_home()),
            Command::End => self.controller.edit(|input| input.move_end()),
        }
        Flow::Continue
    }

    fn submit(&mut self) {
        let entries_before = self.controller.transcript().len();

        if let Submission::Accepted(text) = self.controller.submit_input() {
            let client = self.controller.client();
            let request = self.controller.request_for(&text);
            let results_tx = self.results_tx.clone();

            tokio::spawn(async move {
                let result = completion(client.as_ref(), request).await;
                // The receiver only goes away when the app is shutting down
                let _ = results_tx.send(result);
            });
        }

        if self.controller.transcript().len() != entries_before {
            self.scroll_back = 0;
        }
    }

    /// Render any completions that have finished since the last tick.
    pub fn poll_results(&mut self) {
        while let Ok(result) = self.results_rx.try_recv() {
            self.apply(result);
        }
    }

    fn apply(&mut self, result: Result<String, ChatError>) {
        self.controller.finish(result);
        self.scroll_back = 0;
    }

    /// Wait for the in-flight completion, if any, and render it.
    #[cfg(test)]
    pub async fn wait_for_result(&mut self) {
        if let Some(result) = self.results_rx.recv().await {
            self.apply(result);
        }
    }
}

struct TuiState {
    last_tick: Instant,
    keyboard_enhanced: bool,
}

/// Run the interactive chat until the user quits.
pub async fn run(controller: ChatController) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Needed to tell Shift+Enter apart from Enter
    let keyboard_enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if keyboard_enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }
    debug!(keyboard_enhanced, "terminal ready");

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = ChatApp::new(controller);
    let mut state = TuiState {
        last_tick: Instant::now(),
        keyboard_enhanced,
    };

    let tick_rate = Duration::from_millis(100);
    let result = run_app(&mut terminal, &mut app, &mut state, tick_rate).await;

    // Restore terminal
    if state.keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("chat session closed");
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut ChatApp,
    state: &mut TuiState,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(state.last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let Some(command) = command_for_key(key) {
                    if app.handle(command) == Flow::Quit {
                        return Ok(());
                    }
                }
            }
        }

        app.poll_results();

        if state.last_tick.elapsed() >= tick_rate {
            state.last_tick = Instant::now();
        }
    }
}
