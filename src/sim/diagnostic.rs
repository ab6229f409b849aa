//! Rolling per-timestep metrics, kept for the lifetime of one run and
//! exportable as JSON alongside the grid/heatmap output.

use serde::Serialize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct StepMetrics {
    pub timestep: u64,
    pub moving_count: u32,
    pub stopped_count: u32,
    pub got_out_count: u32,
    pub dead_count: u32,
    pub same_target_conflicts: u32,
    pub x_crossing_conflicts: u32,
    pub fire_cell_count: u32,
}

#[derive(Debug)]
pub struct DiagnosticLog {
    history: Vec<StepMetrics>,
    history_size: usize,
    cursor: usize,
}

impl DiagnosticLog {
    pub fn new(history_size: usize) -> Self {
        DiagnosticLog {
            history: vec![StepMetrics::default(); history_size],
            history_size,
            cursor: 0,
        }
    }

    pub fn push(&mut self, metrics: StepMetrics) {
        self.cursor = (self.cursor + 1) % self.history_size;
        self.history[self.cursor] = metrics;
    }

    pub fn last(&self) -> &StepMetrics {
        &self.history[self.cursor]
    }

    /// All recorded steps in chronological order, oldest first.
    pub fn chronological(&self) -> Vec<StepMetrics> {
        let mut ordered = Vec::with_capacity(self.history.len());
        for offset in 1..=self.history_size {
            let index = (self.cursor + offset) % self.history_size;
            if self.history[index].timestep != 0 || index == self.cursor {
                ordered.push(self.history[index].clone());
            }
        }
        ordered
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        DiagnosticLog::new(600)
    }
}
