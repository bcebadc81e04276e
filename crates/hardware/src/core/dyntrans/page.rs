//! Translation pages and the per-CPU page cache.
//!
//! A translation page holds one IC slot per instruction word of a 4 KiB
//! physical code page. Every slot starts bound to the translate-on-demand
//! handler and is overwritten with the decoded IC the first time it runs.
//!
//! Pages live in an arena (`Vec`) indexed by `PageIndex`, with a hash map from
//! physical page address to index. The cache is all-or-nothing: when it is
//! full, or when it is reset, every page goes at once and every cursor into it
//! must be resynchronised.

use std::collections::HashMap;

use tracing::debug;

use super::ic::Ic;
use crate::common::{PhysAddr, SLOTS_PER_PAGE};
use crate::isa::Arch;

/// Index of a page in the arena.
pub type PageIndex = usize;

/// Decoded instruction slots for one physical page.
pub struct TranslationPage<A: Arch> {
    paddr: PhysAddr,
    slots: Box<[Ic<A>]>,
}

impl<A: Arch> TranslationPage<A> {
    fn new(paddr: PhysAddr) -> Self {
        Self {
            paddr,
            slots: vec![super::untranslated::<A>(); SLOTS_PER_PAGE].into_boxed_slice(),
        }
    }

    /// Physical base address of the page.
    pub const fn paddr(&self) -> PhysAddr {
        self.paddr
    }

    /// Returns the IC bound at `slot`.
    #[inline(always)]
    pub fn slot(&self, slot: usize) -> Option<&Ic<A>> {
        self.slots.get(slot)
    }
}

/// Per-CPU cache of translation pages keyed by physical page.
pub struct TranslationCache<A: Arch> {
    pages: Vec<TranslationPage<A>>,
    index: HashMap<PhysAddr, PageIndex>,
    max_pages: usize,
}

impl<A: Arch> TranslationCache<A> {
    /// Creates an empty cache that holds at most `max_pages` pages.
    pub fn new(max_pages: usize) -> Self {
        Self {
            pages: Vec::new(),
            index: HashMap::new(),
            max_pages: max_pages.max(1),
        }
    }

    /// Number of live pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` when no page is cached.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Finds the page for a physical address.
    pub fn find(&self, paddr: PhysAddr) -> Option<PageIndex> {
        self.index.get(&paddr.page()).copied()
    }

    /// Returns the page for a physical address, creating it if needed.
    ///
    /// # Returns
    ///
    /// The page index and whether the whole cache was flushed to make room.
    /// A flush invalidates every previously returned index.
    pub fn get_or_create(&mut self, paddr: PhysAddr) -> (PageIndex, bool) {
        let key = paddr.page();
        if let Some(&idx) = self.index.get(&key) {
            return (idx, false);
        }
        let flushed = self.pages.len() >= self.max_pages;
        if flushed {
            debug!(pages = self.pages.len(), "translation cache full, flushing");
            self.clear();
        }
        let idx = self.pages.len();
        self.pages.push(TranslationPage::new(key));
        let _ = self.index.insert(key, idx);
        (idx, flushed)
    }

    /// Reads the IC at (`page`, `slot`).
    #[inline(always)]
    pub fn ic(&self, page: PageIndex, slot: usize) -> Option<Ic<A>> {
        self.pages.get(page).and_then(|p| p.slot(slot)).copied()
    }

    /// Overwrites the IC at (`page`, `slot`).
    pub fn store(&mut self, page: PageIndex, slot: usize, ic: Ic<A>) {
        if let Some(dst) = self.pages.get_mut(page).and_then(|p| p.slots.get_mut(slot)) {
            *dst = ic;
        }
    }

    /// Returns the page at `idx`.
    pub fn page(&self, idx: PageIndex) -> Option<&TranslationPage<A>> {
        self.pages.get(idx)
    }

    /// Drops every page.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.index.clear();
    }
}

impl<A: Arch> std::fmt::Debug for TranslationCache<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("pages", &self.pages.len())
            .field("max_pages", &self.max_pages)
            .finish()
    }
}
