/// Progress snapshot published across the boundary at a checkpoint or at completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReport {
    pub iteration: u64,
    pub total: u64,
    /// `round(iteration / total * 100)`, half rounds up
    pub percent: u8,
}

impl ProgressReport {
    /// Build a report for `iteration` out of `total` units.
    ///
    /// `total` must be non-zero; a zero total reports 100% so a degenerate run
    /// still reads as finished.
    pub fn new(iteration: u64, total: u64) -> Self {
        let percent = if total == 0 {
            100
        } else {
            let iteration = iteration.min(total) as u128;
            let total = total as u128;
            // (2 * 100 * i + total) / (2 * total) == floor(i / total * 100 + 0.5)
            ((200 * iteration + total) / (2 * total)) as u8
        };

        Self {
            iteration,
            total,
            percent,
        }
    }

    /// The report published by the completion callback.
    pub fn complete(total: u64) -> Self {
        Self {
            iteration: total,
            total,
            percent: 100,
        }
    }
}

/// Iteration state of a single run.
///
/// Owned exclusively by one [`ChunkedScheduler`](crate::scheduler::ChunkedScheduler)
/// for the duration of a run. Invariant: `0 <= iteration <= total`, and
/// `running` stays true from `start()` until `iteration == total` (or the run
/// is cancelled or fails).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskState {
    pub iteration: u64,
    pub total: u64,
    pub running: bool,
}

impl TaskState {
    pub fn new(total: u64) -> Self {
        Self {
            iteration: 0,
            total,
            running: false,
        }
    }

    /// Reset the counter and mark the run active.
    pub fn begin(&mut self) {
        self.iteration = 0;
        self.running = true;
    }

    /// Perform one unit of bookkeeping, never moving past `total`.
    pub fn advance(&mut self) -> u64 {
        if self.iteration < self.total {
            self.iteration += 1;
        }
        self.iteration
    }

    pub fn is_complete(&self) -> bool {
        self.iteration >= self.total
    }

    /// True on a multiple of `cadence` that is not the final iteration.
    ///
    /// The final iteration is reserved for the completion callback so the two
    /// never fire on the same tick.
    pub fn is_checkpoint(&self, cadence: u64) -> bool {
        cadence > 0
            && self.iteration > 0
            && self.iteration < self.total
            && self.iteration % cadence == 0
    }

    pub fn report(&self) -> ProgressReport {
        ProgressReport::new(self.iteration, self.total)
    }
}
