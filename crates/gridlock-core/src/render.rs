//! Grid renderer.
//!
//! Draws the grid to an output sink while the run is active. Each frame is
//! a short snapshot taken under the board lock and written outside it, one
//! row per line followed by a blank line. In-place mode moves the cursor
//! back to a fixed row before every frame so the grid redraws over itself.
//! A failing sink stops the renderer, never the simulation.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::board::{CoordinationError, SharedBoard};
use crate::config::RenderConfig;
use crate::control::RunControl;

/// Errors raised while drawing a frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The sink rejected a write.
    #[error("failed to write frame: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The grid snapshot could not be taken.
    #[error("failed to snapshot grid: {source}")]
    Coordination {
        /// The underlying coordination error.
        #[from]
        source: CoordinationError,
    },
}

/// Format one frame from rendered grid rows.
pub fn format_frame(rows: &[String], config: &RenderConfig) -> String {
    let mut frame = String::new();
    if config.in_place {
        // ANSI cursor position is 1-based.
        frame.push_str(&format!("\x1b[{};1H", config.origin_row.saturating_add(1)));
    }
    for row in rows {
        frame.push_str(row);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

/// Periodic grid printer.
#[derive(Debug)]
pub struct Renderer<W> {
    board: Arc<SharedBoard>,
    control: Arc<RunControl>,
    config: RenderConfig,
    interval: Duration,
    sink: W,
}

impl<W: Write> Renderer<W> {
    /// Create a renderer writing to `sink`.
    pub const fn new(
        board: Arc<SharedBoard>,
        control: Arc<RunControl>,
        config: RenderConfig,
        interval: Duration,
        sink: W,
    ) -> Self {
        Self {
            board,
            control,
            config,
            interval,
            sink,
        }
    }

    /// Snapshot the grid and write one frame.
    pub fn draw(&mut self) -> Result<(), RenderError> {
        let rows = self.board.render_rows()?;
        let frame = format_frame(&rows, &self.config);
        self.sink.write_all(frame.as_bytes())?;
        self.sink.flush()?;
        Ok(())
    }

    /// Draw frames until the run stops, then draw the final state once.
    ///
    /// Returns the sink.
    pub async fn run(mut self) -> W {
        debug!(interval_ms = self.interval.as_millis(), "Renderer started");
        while self.control.is_running() {
            if let Err(e) = self.draw() {
                warn!(error = %e, "Renderer stopped early");
                return self.sink;
            }
            if self.interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.interval).await;
            }
        }
        if let Err(e) = self.draw() {
            warn!(error = %e, "Failed to draw final frame");
        }
        debug!("Renderer stopped");
        self.sink
    }
}
