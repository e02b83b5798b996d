use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::{debounce::Debouncer, ClientResult, UsersClient};
use crate::users::User;

/// Outcome of one settled search term.
#[derive(Debug)]
pub struct SearchResult {
    pub term: String,
    pub users: ClientResult<Vec<User>>,
}

/// Search-as-you-type: keystrokes are debounced and each settled term
/// becomes a single list request.
pub struct LiveSearch {
    debouncer: Debouncer<String>,
    worker: JoinHandle<()>,
}

impl LiveSearch {
    pub fn spawn(client: Arc<UsersClient>, delay: Duration) -> (Self, mpsc::UnboundedReceiver<SearchResult>) {
        let (debouncer, mut terms) = Debouncer::<String>::new(delay);
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            while let Some(term) = terms.recv().await {
                let trimmed = term.trim();
                let search = (!trimmed.is_empty()).then_some(trimmed);
                let users = client.list(search).await;
                if tx.send(SearchResult { term, users }).is_err() {
                    break;
                }
            }
        });

        (Self { debouncer, worker }, rx)
    }

    /// Records the current contents of the search box.
    pub fn input(&mut self, text: impl Into<String>) {
        self.debouncer.push(text.into());
    }
}

impl Drop for LiveSearch {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
