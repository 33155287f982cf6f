// Presentation boundary: outward notices and inward user requests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Status field keys pushed through `update_field`
pub const FIELD_BALANCE: &str = "Balance";
pub const FIELD_MEMPOOL: &str = "MemPool";
pub const FIELD_BLOCKCHAIN: &str = "Blockchain";

/// User input for a new transaction draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRequest {
    /// Decimal coin string, parsed by the node
    pub amount: String,
    /// Name of a known node
    pub recipient: String,
}

impl DraftRequest {
    pub fn new(amount: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            recipient: recipient.into(),
        }
    }
}

/// What a node shows to, and asks of, its user
///
/// A `None` answer to a request means the user cancelled.
pub trait Presenter: Send {
    fn log(&self, message: &str);

    fn show_block_summary(&self, summary: &str);

    fn report_result(&self, message: &str, success: bool);

    fn update_field(&self, key: &str, value: &str);

    fn request_transaction_draft(&mut self, known_recipients: &[String]) -> Option<DraftRequest>;

    /// Pick one transaction id out of `candidates`
    fn request_transaction_choice(&mut self, candidates: &[String]) -> Option<String>;
}

/// Presenter that writes everything to the log and cancels every request
#[derive(Debug)]
pub struct LogPresenter {
    name: String,
}

impl LogPresenter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Presenter for LogPresenter {
    fn log(&self, message: &str) {
        log::info!("[{}] {}", self.name, message);
    }

    fn show_block_summary(&self, summary: &str) {
        log::info!("[{}] {}", self.name, summary);
    }

    fn report_result(&self, message: &str, success: bool) {
        if success {
            log::info!("[{}] {}", self.name, message);
        } else {
            log::warn!("[{}] {}", self.name, message);
        }
    }

    fn update_field(&self, key: &str, value: &str) {
        log::debug!("[{}] {} = {}", self.name, key, value);
    }

    fn request_transaction_draft(&mut self, _known_recipients: &[String]) -> Option<DraftRequest> {
        log::warn!("[{}] No interactive input; transaction draft cancelled", self.name);
        None
    }

    fn request_transaction_choice(&mut self, _candidates: &[String]) -> Option<String> {
        log::warn!("[{}] No interactive input; selection cancelled", self.name);
        None
    }
}

/// Scripted answer to a transaction choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    First,
    Last,
    Id(String),
    Cancel,
}

#[derive(Debug, Default)]
struct Script {
    drafts: VecDeque<Option<DraftRequest>>,
    choices: VecDeque<Choice>,
    summaries: Vec<String>,
    results: Vec<(String, bool)>,
    fields: HashMap<String, String>,
}

/// Presenter answering requests from queued answers and recording output
///
/// Outward notices are also written to the log. Clones share state, so a
/// caller can keep one handle while a node owns another. Unscripted requests
/// are cancelled.
#[derive(Clone)]
pub struct ScriptedPresenter {
    log: Arc<LogPresenter>,
    script: Arc<Mutex<Script>>,
}

impl ScriptedPresenter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            log: Arc::new(LogPresenter::new(name)),
            script: Arc::default(),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the answer for the next draft request
    pub fn queue_draft(&self, amount: &str, recipient: &str) {
        self.script()
            .drafts
            .push_back(Some(DraftRequest::new(amount, recipient)));
    }

    /// Queue a cancelled draft request
    pub fn queue_draft_cancel(&self) {
        self.script().drafts.push_back(None);
    }

    /// Queue the answer for the next choice request
    pub fn queue_choice(&self, choice: Choice) {
        self.script().choices.push_back(choice);
    }

    pub fn summaries(&self) -> Vec<String> {
        self.script().summaries.clone()
    }

    pub fn results(&self) -> Vec<(String, bool)> {
        self.script().results.clone()
    }

    pub fn last_result(&self) -> Option<(String, bool)> {
        self.script().results.last().cloned()
    }

    pub fn field(&self, key: &str) -> Option<String> {
        self.script().fields.get(key).cloned()
    }
}

impl Presenter for ScriptedPresenter {
    fn log(&self, message: &str) {
        self.log.log(message);
    }

    fn show_block_summary(&self, summary: &str) {
        self.log.show_block_summary(summary);
        self.script().summaries.push(summary.to_string());
    }

    fn report_result(&self, message: &str, success: bool) {
        self.log.report_result(message, success);
        self.script().results.push((message.to_string(), success));
    }

    fn update_field(&self, key: &str, value: &str) {
        self.log.update_field(key, value);
        self.script().fields.insert(key.to_string(), value.to_string());
    }

    fn request_transaction_draft(&mut self, _known_recipients: &[String]) -> Option<DraftRequest> {
        self.script().drafts.pop_front().flatten()
    }

    fn request_transaction_choice(&mut self, candidates: &[String]) -> Option<String> {
        let choice = self.script().choices.pop_front()?;
        match choice {
            Choice::First => candidates.first().cloned(),
            Choice::Last => candidates.last().cloned(),
            Choice::Id(id) => candidates.iter().find(|c| **c == id).cloned(),
            Choice::Cancel => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers_in_order() {
        let mut presenter = ScriptedPresenter::new("a");
        presenter.queue_draft("4", "bob");
        presenter.queue_draft_cancel();

        assert_eq!(
            presenter.request_transaction_draft(&[]),
            Some(DraftRequest::new("4", "bob"))
        );
        assert_eq!(presenter.request_transaction_draft(&[]), None);
        assert_eq!(presenter.request_transaction_draft(&[]), None);
    }

    #[test]
    fn test_scripted_choices() {
        let mut presenter = ScriptedPresenter::new("a");
        let candidates = vec!["t1".to_string(), "t2".to_string()];

        presenter.queue_choice(Choice::Last);
        presenter.queue_choice(Choice::Id("t1".to_string()));
        presenter.queue_choice(Choice::Id("zz".to_string()));
        presenter.queue_choice(Choice::Cancel);

        assert_eq!(presenter.request_transaction_choice(&candidates), Some("t2".to_string()));
        assert_eq!(presenter.request_transaction_choice(&candidates), Some("t1".to_string()));
        assert_eq!(presenter.request_transaction_choice(&candidates), None);
        assert_eq!(presenter.request_transaction_choice(&candidates), None);
        assert!(presenter.request_transaction_choice(&[]).is_none());
    }

    #[test]
    fn test_log_presenter_cancels_requests() {
        let mut presenter = LogPresenter::new("a");
        presenter.report_result("ignored", false);

        assert!(presenter.request_transaction_draft(&["b".to_string()]).is_none());
        assert!(presenter.request_transaction_choice(&["t1".to_string()]).is_none());
    }

    #[test]
    fn test_clones_share_recordings() {
        let presenter = ScriptedPresenter::new("a");
        let observer = presenter.clone();

        presenter.report_result("done", true);
        presenter.update_field(FIELD_BALANCE, "10");

        assert_eq!(observer.last_result(), Some(("done".to_string(), true)));
        assert_eq!(observer.field(FIELD_BALANCE), Some("10".to_string()));
    }
}
