//! Translation Lookaside Buffer (TLB).
//!
//! A software model of an R4000-style, fully associative, software-refilled TLB.
//! Each entry maps an even/odd pair of virtual pages:
//! 1. **Tag:** `vpn2` (virtual address bits above 13), an 8-bit ASID and a global bit.
//! 2. **Page Mask:** Per-entry mask selecting the page size (4 KiB up to 16 MiB);
//!    masked VPN2 bits are ignored when matching.
//! 3. **Data:** Two `EntryLo` halves (PFN, cache attribute, dirty, valid),
//!    selected by the address bit just above the page offset.
//!
//! Lookups scan linearly in array order and the first match wins, so overlapping
//! entries (which real hardware treats as undefined) resolve deterministically.

use crate::common::{AccessFlags, Fault, FaultKind, Mapping, PhysAddr};

/// Bits of the virtual address covered by one half of a 4 KiB page pair.
pub const VPN2_SHIFT: u32 = 13;

/// Physical frame numbers count 4 KiB frames.
pub const PFN_SHIFT: u32 = 12;

/// One half of a TLB entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntryLo {
    /// Physical frame number.
    pub pfn: u64,
    /// Cache coherency attribute (stored, not modelled).
    pub cache: u8,
    /// Writable. A store through a clean page raises a Modify fault.
    pub dirty: bool,
    /// Mapping present. An invalid half raises an Invalid fault.
    pub valid: bool,
}

impl EntryLo {
    /// Decodes the MIPS `EntryLo` register layout (`PFN[29:6] C[5:3] D[2] V[1] G[0]`).
    ///
    /// The global bit is returned separately since it belongs to the whole entry.
    pub const fn from_reg(raw: u64) -> (Self, bool) {
        (
            Self {
                pfn: (raw >> 6) & 0x00ff_ffff,
                cache: ((raw >> 3) & 0x7) as u8,
                dirty: raw & 0x4 != 0,
                valid: raw & 0x2 != 0,
            },
            raw & 0x1 != 0,
        )
    }

    /// Encodes back into the `EntryLo` register layout.
    pub const fn to_reg(self, global: bool) -> u64 {
        (self.pfn << 6)
            | ((self.cache as u64 & 0x7) << 3)
            | ((self.dirty as u64) << 2)
            | ((self.valid as u64) << 1)
            | global as u64
    }
}

/// A single entry in the TLB.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TlbEntry {
    /// Page mask in register form (bits 24..13; zero for 4 KiB pages).
    pub page_mask: u64,
    /// Virtual page-pair number (`vaddr >> 13`).
    pub vpn2: u64,
    /// Address-space identifier.
    pub asid: u8,
    /// Matches regardless of ASID.
    pub global: bool,
    /// Even (`[0]`) and odd (`[1]`) halves.
    pub lo: [EntryLo; 2],
}

impl TlbEntry {
    /// Mask over `vaddr >> 13` selecting the bits that take part in matching.
    #[inline(always)]
    const fn match_mask(&self) -> u64 {
        !(self.page_mask >> VPN2_SHIFT)
    }

    /// Size in bytes of one half of the pair.
    #[inline(always)]
    pub const fn half_size(&self) -> u64 {
        ((self.page_mask | 0x1fff) + 1) >> 1
    }

    /// Returns `true` if the entry maps `vaddr` in address space `asid`.
    #[inline(always)]
    pub const fn matches(&self, vaddr: u64, asid: u8) -> bool {
        let m = self.match_mask();
        ((vaddr >> VPN2_SHIFT) & m) == (self.vpn2 & m) && (self.global || self.asid == asid)
    }

    /// Selects the even or odd half for `vaddr`.
    #[inline(always)]
    pub const fn half(&self, vaddr: u64) -> &EntryLo {
        if vaddr & self.half_size() == 0 {
            &self.lo[0]
        } else {
            &self.lo[1]
        }
    }
}

/// Result of a TLB probe (`TLBP`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    /// Index of the first matching entry.
    Hit(usize),
    /// No entry matches.
    Miss,
}

/// Translation Lookaside Buffer structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlb {
    entries: Vec<TlbEntry>,
}

impl Tlb {
    /// Creates a TLB with `size` zeroed entries.
    ///
    /// Zeroed entries have both halves invalid, so they can only ever produce
    /// Invalid faults for the page pair at virtual address zero.
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![TlbEntry::default(); size],
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the TLB has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in array order.
    pub fn entries(&self) -> &[TlbEntry] {
        &self.entries
    }

    /// Reads an entry (`TLBR`). Out-of-range indices return `None`.
    pub fn read(&self, index: usize) -> Option<&TlbEntry> {
        self.entries.get(index)
    }

    /// Writes an entry (`TLBWI`/`TLBWR`). Out-of-range writes are dropped.
    ///
    /// # Returns
    ///
    /// `true` if the entry was written.
    pub fn write(&mut self, index: usize, entry: TlbEntry) -> bool {
        match self.entries.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    /// Finds the first entry matching `vaddr` in address space `asid` (`TLBP`).
    pub fn probe(&self, vaddr: u64, asid: u8) -> Probe {
        self.entries
            .iter()
            .position(|e| e.matches(vaddr, asid))
            .map_or(Probe::Miss, Probe::Hit)
    }

    /// Translates a mapped virtual address.
    ///
    /// # Arguments
    ///
    /// * `vaddr` - Virtual address to translate.
    /// * `asid` - Current address-space identifier.
    /// * `flags` - Access kind; writes require the dirty bit.
    ///
    /// # Returns
    ///
    /// The mapping, or the fault the CPU core should deliver.
    #[inline(always)]
    pub fn lookup(&self, vaddr: u64, asid: u8, flags: AccessFlags) -> Result<Mapping, Fault> {
        let Some(entry) = self.entries.iter().find(|e| e.matches(vaddr, asid)) else {
            return Err(Fault::new(FaultKind::Refill, vaddr, asid, flags.access));
        };
        let lo = entry.half(vaddr);
        if !lo.valid {
            return Err(Fault::new(FaultKind::Invalid, vaddr, asid, flags.access));
        }
        if flags.is_write() && !lo.dirty {
            return Err(Fault::new(FaultKind::Modify, vaddr, asid, flags.access));
        }
        let offset_mask = entry.half_size() - 1;
        Ok(Mapping {
            paddr: PhysAddr(((lo.pfn << PFN_SHIFT) & !offset_mask) | (vaddr & offset_mask)),
            writable: lo.dirty,
        })
    }

    /// Invalidates every entry.
    pub fn flush(&mut self) {
        for e in &mut self.entries {
            e.lo = [EntryLo::default(); 2];
        }
    }
}
