//! Search index access.
//!
//! [`SearchIndex`] is the external full-text index. [`SearchAccessor`] is the
//! only place that looks at the errors it raises: expected failures of a
//! live index become [`ResolutionOutcome::BackendUnavailable`], everything
//! else propagates untouched.

use async_trait::async_trait;
use mediacache_core::{
    fields, MediaId, MediaResult, ResolutionOutcome, SearchError, SearchResultRow,
    MEDIA_SEARCH_SCOPE, RECYCLE_BIN_PATH_PREFIX,
};
use std::cmp::Ordering;
use std::sync::Arc;

// ============================================================================
// QUERIES
// ============================================================================

/// One filter clause of a compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchClause {
    /// The row's node id equals the value.
    NodeId(MediaId),
    /// The field equals the value.
    FieldEquals { field: String, value: String },
    /// The field must not start with the prefix (a trailing-wildcard
    /// exclusion).
    NotFieldPrefix { field: String, prefix: String },
}

impl SearchClause {
    fn matches(&self, row: &SearchResultRow) -> bool {
        match self {
            Self::NodeId(id) => row.node_id() == Some(*id),
            Self::FieldEquals { field, value } => row.get(field) == Some(value.as_str()),
            Self::NotFieldPrefix { field, prefix } => row
                .get(field)
                .map_or(true, |v| !v.starts_with(prefix.as_str())),
        }
    }
}

/// How a sort field is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Int,
    Text,
}

/// An ascending sort on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub kind: SortKind,
}

/// A compiled query, ready to hand to a [`SearchIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub scope: String,
    pub clauses: Vec<SearchClause>,
    pub sort: Vec<SortField>,
}

impl SearchQuery {
    /// Whether a row satisfies every clause.
    pub fn matches(&self, row: &SearchResultRow) -> bool {
        self.clauses.iter().all(|clause| clause.matches(row))
    }

    /// Order rows by the sort fields. Rows missing an int field sort first.
    pub fn sort_rows(&self, rows: &mut [SearchResultRow]) {
        if self.sort.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for sort in &self.sort {
                let ord = match sort.kind {
                    SortKind::Int => {
                        let a = a.get(&sort.field).and_then(|v| v.trim().parse::<i64>().ok());
                        let b = b.get(&sort.field).and_then(|v| v.trim().parse::<i64>().ok());
                        a.cmp(&b)
                    }
                    SortKind::Text => a.get(&sort.field).cmp(&b.get(&sort.field)),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

/// Builder for [`SearchQuery`].
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    query: SearchQuery,
}

impl SearchCriteria {
    /// Start a query within an index scope.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            query: SearchQuery {
                scope: scope.into(),
                clauses: Vec::new(),
                sort: Vec::new(),
            },
        }
    }

    /// Match a node id.
    pub fn id(mut self, id: MediaId) -> Self {
        self.query.clauses.push(SearchClause::NodeId(id));
        self
    }

    /// Match a parent id.
    pub fn parent_id(mut self, parent_id: MediaId) -> Self {
        self.query.clauses.push(SearchClause::FieldEquals {
            field: fields::PARENT_ID.to_string(),
            value: parent_id.to_string(),
        });
        self
    }

    /// Exclude rows whose field starts with `prefix`.
    pub fn not_field_wildcard(mut self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.query.clauses.push(SearchClause::NotFieldPrefix {
            field: field.into(),
            prefix: prefix.into(),
        });
        self
    }

    /// Exclude everything under the media recycle bin.
    pub fn outside_recycle_bin(self) -> Self {
        self.not_field_wildcard(fields::INDEX_PATH, RECYCLE_BIN_PATH_PREFIX)
    }

    /// Sort ascending on an integer field.
    pub fn order_by_int(mut self, field: impl Into<String>) -> Self {
        self.query.sort.push(SortField {
            field: field.into(),
            kind: SortKind::Int,
        });
        self
    }

    /// Finish the query.
    pub fn compile(self) -> SearchQuery {
        self.query
    }
}

// ============================================================================
// SEARCH INDEX
// ============================================================================

/// External full-text index holding media rows.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Start a query in `scope`.
    fn create_criteria(&self, scope: &str) -> SearchCriteria {
        SearchCriteria::new(scope)
    }

    /// Run a compiled query. Rows come back in index order.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultRow>, SearchError>;
}

// ============================================================================
// ACCESSOR
// ============================================================================

/// Shields resolution from search index failures.
#[derive(Clone, Default)]
pub struct SearchAccessor {
    index: Option<Arc<dyn SearchIndex>>,
}

impl std::fmt::Debug for SearchAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAccessor")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl SearchAccessor {
    /// Accessor over a configured index.
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index: Some(index) }
    }

    /// Accessor for a process where no index was ever set up.
    pub fn unconfigured() -> Self {
        Self { index: None }
    }

    /// Whether an index is configured.
    pub fn is_configured(&self) -> bool {
        self.index.is_some()
    }

    /// Start a media query, or `None` when no index is configured.
    pub fn media_criteria(&self) -> Option<SearchCriteria> {
        self.index
            .as_ref()
            .map(|index| index.create_criteria(MEDIA_SEARCH_SCOPE))
    }

    /// Run a query.
    ///
    /// An empty result is `NotFound`. A missing index, a vanished index file
    /// or a closed index reader is `BackendUnavailable`; the last two are
    /// logged as warnings. Any other failure is returned as an error.
    pub async fn search(
        &self,
        query: &SearchQuery,
    ) -> MediaResult<ResolutionOutcome<Vec<SearchResultRow>>> {
        let Some(index) = &self.index else {
            return Ok(ResolutionOutcome::BackendUnavailable);
        };

        match index.search(query).await {
            Ok(rows) if rows.is_empty() => Ok(ResolutionOutcome::NotFound),
            Ok(rows) => Ok(ResolutionOutcome::Found(rows)),
            Err(e) if e.is_transient() => {
                if matches!(e, SearchError::IndexClosed { .. }) {
                    tracing::warn!(
                        error = %e,
                        scope = %query.scope,
                        "Could not load media from the search index, the process is most likely shutting down"
                    );
                } else {
                    tracing::warn!(error = %e, scope = %query.scope, "Could not load media from the search index");
                }
                Ok(ResolutionOutcome::BackendUnavailable)
            }
            Err(e) => Err(e.into()),
        }
    }
}
