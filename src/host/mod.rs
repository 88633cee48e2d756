// Host module - the view layer side of a run
//
// This module contains:
// - RunController: the "start run" command, spawns the paced loop and handles cancellation
// - ProgressView: follows state changes and draws progress in the terminal

pub mod controller;
pub mod view;

pub use controller::RunController;
pub use view::{ProgressView, render_progress_bar};
