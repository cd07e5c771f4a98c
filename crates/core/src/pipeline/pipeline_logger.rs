use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for the embed → cluster → select run.
///
/// Use cases report into this instead of calling `log` directly so the CLI
/// can print a stage summary while tests stay silent.
pub trait PipelineLogger: Send {
    /// Crop-level progress: `done` of `total` crops embedded.
    fn progress(&mut self, done: usize, total: usize);

    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value such as the number of crops or groups.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _done: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger for the CLI. Progress lines go through `log::info!` at most once
/// per `progress_step` percent; timings and metrics are kept for
/// [`summary`](PipelineLogger::summary).
pub struct StdoutPipelineLogger {
    progress_step: usize,
    last_reported_pct: Option<usize>,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, f64>,
    started: Instant,
    crops: usize,
}

impl StdoutPipelineLogger {
    pub fn new(progress_step: usize) -> Self {
        Self {
            progress_step: progress_step.clamp(1, 100),
            last_reported_pct: None,
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            crops: 0,
        }
    }

    /// Formatted summary, or `None` when nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Clustering summary ({} crops, {:.2}s wall):",
            self.crops,
            elapsed_ms / 1000.0
        )];

        let staged_ms: f64 = self.timings.values().flatten().sum();
        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let share = if staged_ms > 0.0 {
                total_ms / staged_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {stage:8} {total_ms:9.1}ms  ({share:4.1}%)"));
        }

        for (name, value) in &self.metrics {
            lines.push(format!("  {name}: {value}"));
        }

        if let Some(embed_ms) = self.stage_total_ms("embed") {
            if self.crops > 0 && embed_ms > 0.0 {
                let rate = self.crops as f64 / (embed_ms / 1000.0);
                lines.push(format!("  Embedding rate: {rate:.1} crops/s"));
            }
        }

        Some(lines.join("\n"))
    }

    pub fn stage_total_ms(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(|d| d.iter().sum())
    }

    pub fn metric_value(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, done: usize, total: usize) {
        self.crops = total;
        if total == 0 {
            return;
        }
        let pct = done * 100 / total;
        let bucket = pct / self.progress_step;
        let due = match self.last_reported_pct {
            None => true,
            Some(last) => bucket > last / self.progress_step || done == total,
        };
        if due && self.last_reported_pct != Some(pct) {
            self.last_reported_pct = Some(pct);
            log::info!("Embedding: {done}/{total} crops ({pct}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
