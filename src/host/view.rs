// Terminal progress view
//
// Follows StateChange events and renders one line per publication. It only
// ever reacts to events, so it draws as often as the run synchronizes.

use crate::models::RunPhase;
use crate::state::StateChange;
use std::io::{self, Write};
use tokio::sync::broadcast::{self, error::RecvError};

const BAR_WIDTH: usize = 30;

/// Render `percent` as a fixed-width bar, e.g. `[#####-----]`.
pub fn render_progress_bar(percent: u8, width: usize) -> String {
    let percent = usize::from(percent.min(100));
    let filled = percent * width / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Writes run progress to any `Write` (stdout in the binary).
pub struct ProgressView<W: Write> {
    out: W,
    total: u64,
}

impl<W: Write> ProgressView<W> {
    pub fn new(out: W) -> Self {
        Self { out, total: 0 }
    }

    /// Render one change.
    ///
    /// # Returns
    /// The terminal phase once the run has finished, `None` otherwise
    pub fn render(&mut self, change: &StateChange) -> io::Result<Option<RunPhase>> {
        match change {
            StateChange::RunStarted { total } => {
                self.total = *total;
                writeln!(self.out, "Run started: {} units", total)?;
            }
            StateChange::ProgressPublished { percent, iteration } => {
                writeln!(
                    self.out,
                    "{} {:>3}%  ({}/{})",
                    render_progress_bar(*percent, BAR_WIDTH),
                    percent,
                    iteration,
                    self.total
                )?;
            }
            StateChange::RunFinished { phase, error } => {
                match error {
                    Some(error) => writeln!(self.out, "Run {}: {}", phase, error)?,
                    None => writeln!(self.out, "Run {}", phase)?,
                }
                self.out.flush()?;
                return Ok(Some(*phase));
            }
            StateChange::LoadingChanged { loading } => {
                tracing::debug!("Loading indicator: {}", loading);
            }
            StateChange::BoundaryChanged { inside } => {
                tracing::trace!("Inside boundary: {}", inside);
            }
            StateChange::StateReset => {
                self.total = 0;
            }
        }

        self.out.flush()?;
        Ok(None)
    }

    /// Render changes until the run finishes or the channel closes.
    pub async fn follow(
        &mut self,
        mut rx: broadcast::Receiver<StateChange>,
    ) -> io::Result<Option<RunPhase>> {
        tracing::debug!("Progress view following state changes");

        loop {
            match rx.recv().await {
                Ok(change) => {
                    if let Some(phase) = self.render(&change)? {
                        return Ok(Some(phase));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Progress view lagged, skipped {} state changes", skipped);
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("State channel closed");
                    return Ok(None);
                }
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(render_progress_bar(0, 4), "[----]");
        assert_eq!(render_progress_bar(50, 4), "[##--]");
        assert_eq!(render_progress_bar(100, 4), "[####]");
        assert_eq!(render_progress_bar(250, 4), "[####]");
    }

    #[test]
    fn test_render_run() {
        let mut view = ProgressView::new(Vec::new());

        view.render(&StateChange::RunStarted { total: 10 }).unwrap();
        view.render(&StateChange::ProgressPublished {
            percent: 50,
            iteration: 5,
        })
        .unwrap();
        let phase = view
            .render(&StateChange::RunFinished {
                phase: RunPhase::Completed,
                error: None,
            })
            .unwrap();

        assert_eq!(phase, Some(RunPhase::Completed));
        let output = String::from_utf8(view.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Run started: 10 units");
        assert!(lines[1].ends_with(" 50%  (5/10)"));
        assert_eq!(lines[2], "Run completed");
    }

    #[test]
    fn test_boundary_changes_are_not_drawn() {
        let mut view = ProgressView::new(Vec::new());

        view.render(&StateChange::BoundaryChanged { inside: true })
            .unwrap();
        view.render(&StateChange::LoadingChanged { loading: true })
            .unwrap();

        assert!(view.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_follow_stops_at_finish() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(StateChange::RunStarted { total: 4 }).unwrap();
        tx.send(StateChange::RunFinished {
            phase: RunPhase::Failed,
            error: Some("boom".to_string()),
        })
        .unwrap();

        let mut view = ProgressView::new(Vec::new());
        let phase = view.follow(rx).await.unwrap();

        assert_eq!(phase, Some(RunPhase::Failed));
        let output = String::from_utf8(view.into_inner()).unwrap();
        assert!(output.ends_with("Run failed: boom\n"));
    }

    #[tokio::test]
    async fn test_follow_returns_on_close() {
        let (tx, rx) = broadcast::channel::<StateChange>(4);
        drop(tx);

        let mut view = ProgressView::new(Vec::new());

        assert_eq!(view.follow(rx).await.unwrap(), None);
    }
}
