//! Aggregation of task outcomes across documents into the run's final state.

use crate::tasks::{ApplyOutcome, TaskResult};

/// Outcome counts for one configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSummary {
    pub label: String,
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl DocumentSummary {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Counts one task result.
    pub fn record(&mut self, result: &TaskResult) {
        match result.outcome {
            ApplyOutcome::Applied => self.applied += 1,
            ApplyOutcome::Unchanged => self.unchanged += 1,
            ApplyOutcome::Skipped => self.skipped += 1,
            ApplyOutcome::Failed => self.failed += 1,
        }
        self.warnings += result.tally.warnings;
    }
}

/// Totals for the whole run. Folded once per document, read once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
    pub documents: Vec<DocumentSummary>,
}

impl RunSummary {
    pub fn absorb(&mut self, document: DocumentSummary) {
        self.applied += document.applied;
        self.unchanged += document.unchanged;
        self.skipped += document.skipped;
        self.failed += document.failed;
        self.warnings += document.warnings;
        self.documents.push(document);
    }

    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status: 0 when nothing failed anywhere, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    /// The final summary line.
    pub fn headline(&self) -> String {
        let warnings = if self.warnings > 0 {
            format!(", {} warning(s)", self.warnings)
        } else {
            String::new()
        };
        if self.succeeded() {
            format!(
                "Initialization complete ({} applied, {} unchanged, {} skipped{warnings})",
                self.applied, self.unchanged, self.skipped
            )
        } else {
            format!(
                "Initialization had errors ({} failed, {} applied, {} unchanged, {} skipped{warnings})",
                self.failed, self.applied, self.unchanged, self.skipped
            )
        }
    }
}
