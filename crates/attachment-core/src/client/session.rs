//! Search surface state: current input, in-flight query, shown rows and
//! keyboard selection.
//!
//! The session is a plain value. It never performs I/O; the driver asks it
//! what to send and feeds it what came back.

use crate::protocol::{GotoRequest, SearchResult};

/// Keys the surface reacts to while results are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Querying {
        seq: u64,
        query: String,
    },
    Showing {
        results: Vec<SearchResult>,
        selected: Option<usize>,
    },
}

/// A `search` request the driver should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub seq: u64,
    pub query: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    state: SessionState,
    input: String,
    last_seq: u64,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Rows currently on screen.
    pub fn results(&self) -> &[SearchResult] {
        match &self.state {
            SessionState::Showing { results, .. } => results,
            _ => &[],
        }
    }

    pub fn selected(&self) -> Option<usize> {
        match &self.state {
            SessionState::Showing { selected, .. } => *selected,
            _ => None,
        }
    }

    /// The selected row, if any.
    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.selected().and_then(|i| self.results().get(i))
    }

    /// Record what the user typed. Nothing is sent until [`begin_query`]
    /// is called once the input settles.
    ///
    /// [`begin_query`]: SearchSession::begin_query
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Start a query for the settled input.
    ///
    /// Blank input clears the surface and returns `None`.
    pub fn begin_query(&mut self) -> Option<QueryRequest> {
        if self.input.trim().is_empty() {
            self.state = SessionState::Idle;
            return None;
        }
        self.last_seq += 1;
        let request = QueryRequest {
            seq: self.last_seq,
            query: self.input.clone(),
        };
        self.state = SessionState::Querying {
            seq: request.seq,
            query: request.query.clone(),
        };
        Some(request)
    }

    fn is_current(&self, seq: u64) -> bool {
        match &self.state {
            SessionState::Querying { seq: pending, query } => {
                *pending == seq && seq == self.last_seq && *query == self.input
            }
            _ => false,
        }
    }

    /// Apply a `search` response. Returns `false` when the response is stale
    /// and was dropped.
    pub fn apply_results(&mut self, seq: u64, results: Vec<SearchResult>) -> bool {
        if !self.is_current(seq) {
            return false;
        }
        self.state = SessionState::Showing {
            results,
            selected: None,
        };
        true
    }

    /// A `search` request failed. Shows no rows if it was the current one.
    pub fn apply_failure(&mut self, seq: u64) -> bool {
        self.apply_results(seq, Vec::new())
    }

    /// Move the selection one row, wrapping at both ends.
    pub fn move_selection(&mut self, key: NavKey) {
        let SessionState::Showing { results, selected } = &mut self.state else {
            return;
        };
        let len = results.len();
        if len == 0 {
            return;
        }
        *selected = match (key, *selected) {
            (NavKey::Down, None) => Some(0),
            (NavKey::Down, Some(i)) => Some((i + 1) % len),
            (NavKey::Up, None) => Some(len - 1),
            (NavKey::Up, Some(i)) => Some((i + len - 1) % len),
            (NavKey::Confirm, current) => current,
        };
    }

    /// Confirm the selected row. Returns the navigation request and closes
    /// the surface, or `None` when nothing navigable is selected.
    pub fn confirm(&mut self) -> Option<GotoRequest> {
        let request = self.selected_result()?.goto_request()?;
        self.close();
        Some(request)
    }

    /// Close the surface and forget the input.
    pub fn close(&mut self) {
        self.state = SessionState::Idle;
        self.input.clear();
    }
}
