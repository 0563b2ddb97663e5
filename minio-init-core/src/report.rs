//! Reporter implementations that do not write to a terminal.

use std::sync::Mutex;

use crate::contract::{ItemStatus, NoticeLevel, Reporter};
use crate::summary::RunSummary;
use crate::tasks::{TaskDescriptor, TaskResult};

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn document_started(&self, _label: &str) {}
    fn task_started(&self, _task: &TaskDescriptor) {}
    fn item(&self, _status: ItemStatus, _message: &str) {}
    fn task_finished(&self, _task: &TaskDescriptor, _result: &TaskResult) {}
    fn notice(&self, _level: NoticeLevel, _message: &str) {}
    fn summary(&self, _summary: &RunSummary) {}
}

/// One recorded reporter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    DocumentStarted(String),
    TaskStarted(&'static str),
    Item(ItemStatus, String),
    TaskFinished(&'static str, TaskResult),
    Notice(NoticeLevel, String),
    Summary(RunSummary),
}

/// Records every call in order, for assertions.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Item messages with the given status, in order.
    pub fn items(&self, status: ItemStatus) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Item(s, msg) if s == status => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Task results in the order the tasks finished.
    pub fn task_results(&self) -> Vec<(&'static str, TaskResult)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::TaskFinished(name, result) => Some((name, result)),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self, level: NoticeLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Notice(l, msg) if l == level => Some(msg),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for CollectingReporter {
    fn document_started(&self, label: &str) {
        self.push(ReportEvent::DocumentStarted(label.to_string()));
    }

    fn task_started(&self, task: &TaskDescriptor) {
        self.push(ReportEvent::TaskStarted(task.name));
    }

    fn item(&self, status: ItemStatus, message: &str) {
        self.push(ReportEvent::Item(status, message.to_string()));
    }

    fn task_finished(&self, task: &TaskDescriptor, result: &TaskResult) {
        self.push(ReportEvent::TaskFinished(task.name, result.clone()));
    }

    fn notice(&self, level: NoticeLevel, message: &str) {
        self.push(ReportEvent::Notice(level, message.to_string()));
    }

    fn summary(&self, summary: &RunSummary) {
        self.push(ReportEvent::Summary(summary.clone()));
    }
}
