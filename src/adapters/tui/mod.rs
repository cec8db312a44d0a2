//! Terminal front end: raw-mode setup, the event loop and screen drawing.

pub mod draw;
pub mod keys;

use std::io::{self, Stdout};
use std::time::Instant;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::AppContext;
use crate::domain::error::SpotsimError;

fn terminal_error(e: io::Error) -> SpotsimError {
    SpotsimError::Terminal {
        reason: e.to_string(),
    }
}

/// Raw mode and the alternate screen for as long as it lives. Restores the
/// terminal on drop, including when the loop returns early with an error.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self, SpotsimError> {
        enable_raw_mode().map_err(terminal_error)?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(terminal_error(e));
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(terminal_error(e));
            }
        };
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "failed to leave raw mode");
        }
        if let Err(e) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            tracing::warn!(error = %e, "failed to leave alternate screen");
        }
        let _ = self.terminal.show_cursor();
    }
}

/// Draw, wait up to one tick for a key, apply it, then run periodic work.
/// Returns once the navigator reaches the exit screen.
pub fn run(ctx: &mut AppContext) -> Result<(), SpotsimError> {
    let mut guard = TerminalGuard::enter()?;
    tracing::info!("terminal session started");

    while !ctx.should_exit() {
        guard
            .terminal
            .draw(|frame| draw::draw(frame, ctx))
            .map_err(terminal_error)?;

        let tick = ctx.config().tick;
        if event::poll(tick).map_err(terminal_error)? {
            match event::read().map_err(terminal_error)? {
                Event::Key(event) => {
                    if let Some(key) = keys::map_key(event) {
                        ctx.handle_key(key, Instant::now());
                    }
                }
                Event::Resize(width, height) => {
                    tracing::debug!(width, height, "terminal resized");
                }
                _ => {}
            }
        }
        ctx.tick(Instant::now());
    }

    tracing::info!("terminal session ended");
    Ok(())
}
