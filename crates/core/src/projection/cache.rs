//! List and detail view caching using Moka.
//!
//! Projections are derived data. The write flows announce which views a
//! write touched through `ViewInvalidator`; the cache evicts exactly those.
//!
//! A reader loads a view outside any lock, so a write can commit between
//! the load and the store. Each invalidation bumps a generation counter
//! first; readers take a `ViewTicket` before loading and the cache drops a
//! stored view whose ticket went stale.

use moka::sync::Cache;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{ListFilter, Projection, TransactionView};
use crate::posting::DocumentKind;

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 100;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

const KINDS: [DocumentKind; 3] = [
    DocumentKind::CashSales,
    DocumentKind::CreditSales,
    DocumentKind::GoodsPurchase,
];

/// A view affected by a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedView {
    /// Every list that can show documents of this type.
    List(DocumentKind),
    /// The edit view of one document.
    Detail(String),
}

/// Receives the views a committed write made stale.
pub trait ViewInvalidator: Send + Sync {
    /// Marks the given views stale.
    fn invalidate(&self, views: &[CachedView]);
}

/// Invalidator for callers without cached views.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl ViewInvalidator for NoopInvalidator {
    fn invalidate(&self, _views: &[CachedView]) {}
}

/// Write generation observed before a view was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTicket(u64);

#[derive(Debug, Default)]
struct Generations {
    lists: [AtomicU64; KINDS.len()],
    details: AtomicU64,
}

impl Generations {
    fn list_slot(kind: DocumentKind) -> usize {
        match kind {
            DocumentKind::CashSales => 0,
            DocumentKind::CreditSales => 1,
            DocumentKind::GoodsPurchase => 2,
        }
    }

    fn list(&self, filter: &ListFilter) -> u64 {
        KINDS
            .iter()
            .filter(|kind| filter.includes(**kind))
            .map(|kind| self.lists[Self::list_slot(*kind)].load(Ordering::SeqCst))
            .fold(0, u64::wrapping_add)
    }

    fn bump_list(&self, kind: DocumentKind) {
        self.lists[Self::list_slot(kind)].fetch_add(1, Ordering::SeqCst);
    }

    fn detail(&self) -> u64 {
        self.details.load(Ordering::SeqCst)
    }

    fn bump_detail(&self) {
        self.details.fetch_add(1, Ordering::SeqCst);
    }
}

/// Cache for list projections and document detail views.
#[derive(Clone)]
pub struct ProjectionCache {
    lists: Cache<ListFilter, Arc<Projection>>,
    details: Cache<String, Arc<TransactionView>>,
    generations: Arc<Generations>,
}

impl ProjectionCache {
    /// Creates a new cache with default settings.
    ///
    /// Default: 100 entries max per view family, 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a new cache with custom configuration.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);

        Self {
            lists: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            details: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            generations: Arc::new(Generations::default()),
        }
    }

    /// Returns the cached projection for a filter.
    #[must_use]
    pub fn list(&self, filter: &ListFilter) -> Option<Arc<Projection>> {
        self.lists.get(filter)
    }

    /// Takes a ticket to pass to `put_list`. Call before loading.
    #[must_use]
    pub fn list_ticket(&self, filter: &ListFilter) -> ViewTicket {
        ViewTicket(self.generations.list(filter))
    }

    /// Stores a projection loaded under `ticket` and returns the shared
    /// handle. The projection is not kept if a matching write was
    /// announced since the ticket was taken.
    pub fn put_list(
        &self,
        filter: ListFilter,
        projection: Projection,
        ticket: ViewTicket,
    ) -> Arc<Projection> {
        let projection = Arc::new(projection);
        self.lists.insert(filter.clone(), Arc::clone(&projection));

        // Checked after the insert: an invalidation that lands before this
        // check is caught here, one that lands after it evicts the entry.
        if self.list_ticket(&filter) != ticket {
            self.lists.invalidate(&filter);
        }
        projection
    }

    /// Returns the cached detail view of a document.
    #[must_use]
    pub fn detail(&self, document_number: &str) -> Option<Arc<TransactionView>> {
        self.details.get(document_number)
    }

    /// Takes a ticket to pass to `put_detail`. Call before loading.
    #[must_use]
    pub fn detail_ticket(&self) -> ViewTicket {
        ViewTicket(self.generations.detail())
    }

    /// Stores a detail view loaded under `ticket` and returns the shared
    /// handle. The view is not kept if any document was invalidated since
    /// the ticket was taken.
    pub fn put_detail(&self, view: TransactionView, ticket: ViewTicket) -> Arc<TransactionView> {
        let view = Arc::new(view);
        let key = view.document_number.clone();
        self.details.insert(key.clone(), Arc::clone(&view));

        if self.detail_ticket() != ticket {
            self.details.invalidate(&key);
        }
        view
    }

    fn invalidate_lists_of(&self, kind: DocumentKind) {
        let stale: Vec<Arc<ListFilter>> = self
            .lists
            .iter()
            .filter(|(filter, _)| filter.includes(kind))
            .map(|(filter, _)| filter)
            .collect();

        for filter in stale {
            self.lists.invalidate(filter.as_ref());
        }
    }
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewInvalidator for ProjectionCache {
    fn invalidate(&self, views: &[CachedView]) {
        for view in views {
            match view {
                CachedView::List(kind) => {
                    self.generations.bump_list(*kind);
                    self.invalidate_lists_of(*kind);
                }
                CachedView::Detail(document_number) => {
                    self.generations.bump_detail();
                    self.details.invalidate(document_number);
                }
            }
        }
    }
}
