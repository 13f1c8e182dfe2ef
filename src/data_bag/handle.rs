//! Shared `DataBag` handles and fallback chains.

use super::DataBagImpl;
use crate::config::StoreConfig;
use crate::error::{DataError, DataResult};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashSet;
use std::sync::Arc;

/// Shared handle to a [`DataBagImpl`] with fallback bags
///
/// Mutable bags own their store; immutable bags are empty and only combine
/// their fallbacks. Identity is the handle's address (`Arc::ptr_eq`).
#[derive(Debug)]
pub struct DataBag {
    inner: RwLock<DataBagImpl>,
    fallbacks: Vec<Arc<DataBag>>,
    mutable: bool,
}

impl DataBag {
    /// Fresh mutable bag
    pub fn empty() -> Arc<Self> {
        Self::from_impl(DataBagImpl::new())
    }

    /// Fresh mutable bag sized by the store configuration
    pub fn with_config(config: &StoreConfig) -> Arc<Self> {
        Self::from_impl(DataBagImpl::with_capacity(config.initial_capacity))
    }

    /// Wrap an existing store as a mutable bag
    pub fn from_impl(inner: DataBagImpl) -> Arc<Self> {
        Arc::new(DataBag {
            inner: RwLock::new(inner),
            fallbacks: Vec::new(),
            mutable: true,
        })
    }

    /// Immutable empty bag whose reads fall through to `fallbacks` in order
    pub fn immutable_empty_with_fallbacks<I>(fallbacks: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Option<Arc<DataBag>>>,
    {
        Arc::new(DataBag {
            inner: RwLock::new(DataBagImpl::new()),
            fallbacks: fallbacks.into_iter().flatten().collect(),
            mutable: false,
        })
    }

    /// Combine bags without copying
    ///
    /// A single input is returned as is. Otherwise missing and repeated bags
    /// are dropped; one remaining bag is returned as is, several become the
    /// fallbacks of a new immutable bag.
    pub fn common_or_merged(bags: &[Option<Arc<DataBag>>]) -> Option<Arc<DataBag>> {
        if bags.len() == 1 {
            return bags[0].clone();
        }
        let mut seen = HashSet::new();
        let mut unique: Vec<Arc<DataBag>> = Vec::with_capacity(bags.len());
        for bag in bags.iter().flatten() {
            if seen.insert(Arc::as_ptr(bag)) {
                unique.push(Arc::clone(bag));
            }
        }
        match unique.len() {
            0 => None,
            1 => unique.pop(),
            _ => Some(Self::immutable_empty_with_fallbacks(
                unique.into_iter().map(Some),
            )),
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn fallbacks(&self) -> &[Arc<DataBag>] {
        &self.fallbacks
    }

    pub fn read(&self) -> RwLockReadGuard<'_, DataBagImpl> {
        self.inner.read_recursive()
    }

    /// Write access; fails for immutable bags
    pub fn write(&self) -> DataResult<RwLockWriteGuard<'_, DataBagImpl>> {
        if !self.mutable {
            return Err(DataError::failed_precondition(
                "cannot modify an immutable DataBag",
            ));
        }
        Ok(self.inner.write())
    }
}

/// Pre-order, de-duplicated list of a bag's transitive fallbacks
///
/// The bag itself is excluded. Each fallback appears once, at the position of
/// its first visit in a depth-first walk that respects priority order.
pub struct FlattenFallbackFinder {
    fallbacks: Vec<Arc<DataBag>>,
}

impl FlattenFallbackFinder {
    pub fn new(bag: &DataBag) -> Self {
        let mut seen: HashSet<*const DataBag> = HashSet::new();
        seen.insert(std::ptr::from_ref(bag));
        let mut stack: Vec<Arc<DataBag>> = bag.fallbacks.iter().rev().cloned().collect();
        let mut fallbacks = Vec::new();
        while let Some(fallback) = stack.pop() {
            if !seen.insert(Arc::as_ptr(&fallback)) {
                continue;
            }
            stack.extend(fallback.fallbacks.iter().rev().cloned());
            fallbacks.push(fallback);
        }
        FlattenFallbackFinder { fallbacks }
    }

    pub fn fallbacks(&self) -> &[Arc<DataBag>] {
        &self.fallbacks
    }

    /// Read guards on every flattened fallback, in priority order
    pub fn read_all(&self) -> ReadGuards<'_> {
        ReadGuards {
            guards: self.fallbacks.iter().map(|bag| bag.read()).collect(),
        }
    }
}

/// Read guards held for the duration of one operation
pub struct ReadGuards<'a> {
    guards: Vec<RwLockReadGuard<'a, DataBagImpl>>,
}

impl ReadGuards<'_> {
    /// The guarded stores as a fallback span
    pub fn span(&self) -> Vec<&DataBagImpl> {
        self.guards.iter().map(|guard| &**guard).collect()
    }
}
