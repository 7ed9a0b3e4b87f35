use crate::backend::{Completion, Reply, Request, Ticket, Transport};

/// State of the last search, for the status row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStatus {
    Inactive,
    Searching,
    Matches(usize),
    NoMatches,
    Failed(String),
}

/// An optional subsequence of item indices that `next`/`prev` walk through
#[derive(Debug)]
pub struct Filter {
    query: String,
    matches: Vec<usize>,
    status: FilterStatus,
    pending: Option<Ticket>,
}

impl Default for Filter {
    fn default() -> Self {
        Filter {
            query: String::new(),
            matches: Vec::new(),
            status: FilterStatus::Inactive,
            pending: None,
        }
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn status(&self) -> &FilterStatus {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn owns(&self, ticket: Ticket) -> bool {
        self.pending == Some(ticket)
    }

    /// Start a search. An empty query clears the filter instead.
    pub fn search(&mut self, query: &str, tx: &mut dyn Transport) -> Option<Ticket> {
        let query = query.trim();
        if query.is_empty() {
            self.clear();
            return None;
        }
        let ticket = tx.submit(Request::Search(query.to_string()));
        self.query = query.to_string();
        self.pending = Some(ticket);
        self.status = FilterStatus::Searching;
        Some(ticket)
    }

    pub fn clear(&mut self) {
        if self.is_active() {
            tracing::debug!(query = %self.query, "clearing filter");
        }
        *self = Filter::default();
    }

    /// Take a search result. Returns the first match when there is one;
    /// the caller moves the cursor there. An empty or failed search leaves
    /// no filter active and the cursor where it is.
    pub fn on_completion(&mut self, completion: Completion) -> Option<usize> {
        if !self.owns(completion.ticket) {
            tracing::debug!(ticket = completion.ticket, "dropping superseded search result");
            return None;
        }
        self.pending = None;
        match completion.result {
            Ok(Reply::Matches(matches)) if matches.is_empty() => {
                tracing::info!(query = %self.query, "no matches");
                self.matches.clear();
                self.status = FilterStatus::NoMatches;
                None
            }
            Ok(Reply::Matches(matches)) => {
                tracing::info!(query = %self.query, count = matches.len(), "search matched");
                self.status = FilterStatus::Matches(matches.len());
                let first = matches.first().copied();
                self.matches = matches;
                first
            }
            Ok(other) => {
                self.fail(format!("unexpected reply {:?}", other));
                None
            }
            Err(e) => {
                self.fail(e.to_string());
                None
            }
        }
    }

    fn fail(&mut self, message: String) {
        tracing::error!(query = %self.query, "search failed: {}", message);
        self.matches.clear();
        self.status = FilterStatus::Failed(message);
    }

    /// Smallest match after `current`, wrapping to the smallest match
    pub fn next_index(&self, current: usize) -> Option<usize> {
        let after = self.matches.iter().copied().filter(|&i| i > current).min();
        after.or_else(|| self.matches.iter().copied().min())
    }

    /// Largest match before `current`, wrapping to the largest match
    pub fn prev_index(&self, current: usize) -> Option<usize> {
        let before = self.matches.iter().copied().filter(|&i| i < current).max();
        before.or_else(|| self.matches.iter().copied().max())
    }

    /// Status text, if there is anything to say
    pub fn message(&self) -> Option<String> {
        match &self.status {
            FilterStatus::Inactive => None,
            FilterStatus::Searching => Some(format!("searching for {:?}", self.query)),
            FilterStatus::Matches(1) => Some("1 match".to_string()),
            FilterStatus::Matches(n) => Some(format!("{} matches", n)),
            FilterStatus::NoMatches => Some("No matches".to_string()),
            FilterStatus::Failed(e) => Some(format!("search failed: {}", e)),
        }
    }
}
