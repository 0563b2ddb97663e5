//! Human-readable progress output on stdout.

use std::io::{self, Write};
use std::sync::Mutex;

use colored::Colorize;
use minio_init_core::contract::{ItemStatus, NoticeLevel, Reporter};
use minio_init_core::summary::RunSummary;
use minio_init_core::tasks::{ApplyOutcome, TaskDescriptor, TaskResult};

const RULE_WIDTH: usize = 50;

/// Writes the run's progress as indented, coloured lines.
pub struct ConsoleReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn line(&self, text: impl std::fmt::Display) {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        // Progress output is best effort; a closed stdout must not abort the run.
        let _ = writeln!(out, "{text}");
    }

    /// Start-of-run banner.
    pub fn banner(&self, endpoint: &str) {
        self.line("MinIO Init".bold());
        self.line(format!("Endpoint: {}", endpoint.cyan()));
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn document_started(&self, label: &str) {
        self.line("");
        self.line(format!("── Processing {label} configuration ──").bold().cyan());
    }

    fn task_started(&self, task: &TaskDescriptor) {
        self.line("");
        self.line(format!("> {}", task.name).bold());
        self.line(format!("  {}", task.description).dimmed());
    }

    fn item(&self, status: ItemStatus, message: &str) {
        let text = match status {
            ItemStatus::Created => format!("  + {message}").green(),
            ItemStatus::Updated => format!("  ~ {message}").yellow(),
            ItemStatus::Unchanged => format!("  = {message}").dimmed(),
            ItemStatus::Detail => format!("      {message}").dimmed(),
            ItemStatus::Warning => format!("  ! {message}").yellow(),
            ItemStatus::Failed => format!("  x {message}").red(),
        };
        self.line(text);
    }

    fn task_finished(&self, _task: &TaskDescriptor, result: &TaskResult) {
        let text = match result.outcome {
            ApplyOutcome::Applied => format!("  ✓ {}", result.message).green(),
            ApplyOutcome::Unchanged => format!("  = {}", result.message).dimmed(),
            ApplyOutcome::Skipped => format!("  - Skipped: {}", result.message).dimmed(),
            ApplyOutcome::Failed => format!("  ✗ Failed: {}", result.message).red(),
        };
        self.line(text);
    }

    fn notice(&self, level: NoticeLevel, message: &str) {
        let text = match level {
            NoticeLevel::Info => message.normal(),
            NoticeLevel::Success => message.green(),
            NoticeLevel::Warning => message.yellow(),
            NoticeLevel::Error => message.red(),
        };
        self.line(text);
    }

    fn summary(&self, summary: &RunSummary) {
        self.line("");
        self.line("─".repeat(RULE_WIDTH));
        if summary.documents.len() > 1 {
            for doc in &summary.documents {
                self.line(
                    format!(
                        "  {}: {} applied, {} unchanged, {} skipped, {} failed",
                        doc.label, doc.applied, doc.unchanged, doc.skipped, doc.failed
                    )
                    .dimmed(),
                );
            }
        }
        let headline = summary.headline();
        if summary.succeeded() {
            self.line(headline.green().bold());
        } else {
            self.line(headline.red().bold());
        }
    }
}
