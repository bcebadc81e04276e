//! # TLB Lookup Tests
//!
//! The TLB scans entries in array order and the first match wins. Lookups are
//! checked against a straightforward reference model over random contents.

use dtemu_core::common::{AccessFlags, Fault, FaultKind, Mapping, PhysAddr};
use dtemu_core::core::mmu::{EntryLo, Probe, Tlb, TlbEntry};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn lo(pfn: u64, dirty: bool, valid: bool) -> EntryLo {
    EntryLo {
        pfn,
        cache: 3,
        dirty,
        valid,
    }
}

#[test]
fn test_worked_example() {
    // VPN2 X, ASID 2, both halves valid and dirty, PFN Y.
    let (x, y) = (0x0012_3u64, 0x0456u64);
    let mut tlb = Tlb::new(8);
    assert!(tlb.write(
        5,
        TlbEntry {
            page_mask: 0,
            vpn2: x,
            asid: 2,
            global: false,
            lo: [lo(y, true, true), lo(y + 1, true, true)],
        }
    ));

    let vaddr = (x << 13) | 0x0abc;
    assert_eq!(
        tlb.lookup(vaddr, 2, AccessFlags::WRITE),
        Ok(Mapping {
            paddr: PhysAddr((y << 12) | 0xabc),
            writable: true,
        })
    );
    assert_eq!(tlb.probe(vaddr, 2), Probe::Hit(5));

    // Other address spaces miss.
    assert_eq!(
        tlb.lookup(vaddr, 3, AccessFlags::READ).map_err(|f| f.kind),
        Err(FaultKind::Refill)
    );
    assert_eq!(tlb.probe(vaddr, 3), Probe::Miss);
}

#[test]
fn test_fault_kinds() {
    let mut tlb = Tlb::new(2);
    assert!(tlb.write(
        0,
        TlbEntry {
            page_mask: 0,
            vpn2: 0x200,
            asid: 0,
            global: true,
            lo: [lo(0x10, false, true), lo(0x11, true, false)],
        }
    ));
    let even = 0x200u64 << 13;
    let odd = even | 0x1000;

    assert!(tlb.lookup(even, 7, AccessFlags::READ).is_ok());
    assert_eq!(
        tlb.lookup(even, 7, AccessFlags::WRITE),
        Err(Fault::new(FaultKind::Modify, even, 7, AccessFlags::WRITE.access))
    );
    assert_eq!(
        tlb.lookup(odd, 7, AccessFlags::READ).map_err(|f| f.kind),
        Err(FaultKind::Invalid)
    );
    assert_eq!(
        tlb.lookup(even + 0x2000, 7, AccessFlags::FETCH).map_err(|f| f.kind),
        Err(FaultKind::Refill)
    );
}

#[test]
fn test_probe_lookup_does_not_change_contents() {
    let mut tlb = Tlb::new(4);
    assert!(tlb.write(1, TlbEntry::default()));
    let before = tlb.clone();
    let _ = tlb.lookup(0x1234, 0, AccessFlags::READ.probe());
    let _ = tlb.lookup(0x1234, 0, AccessFlags::WRITE.probe());
    assert_eq!(tlb, before);
}

#[test]
fn test_out_of_range_write_is_dropped() {
    let mut tlb = Tlb::new(4);
    assert!(!tlb.write(4, TlbEntry::default()));
    assert_eq!(tlb.len(), 4);
}

/// Reference translation: first matching entry in array order.
fn reference(entries: &[TlbEntry], vaddr: u64, asid: u8, write: bool) -> Result<u64, FaultKind> {
    for e in entries {
        let ignore = e.page_mask >> 13;
        let tag_match = (vaddr >> 13) & !ignore == e.vpn2 & !ignore;
        if !tag_match || !(e.global || e.asid == asid) {
            continue;
        }
        let half_size = (e.page_mask + 0x2000) / 2;
        let half = if vaddr & half_size == 0 { e.lo[0] } else { e.lo[1] };
        if !half.valid {
            return Err(FaultKind::Invalid);
        }
        if write && !half.dirty {
            return Err(FaultKind::Modify);
        }
        let offset = vaddr % half_size;
        return Ok(((half.pfn << 12) / half_size * half_size) + offset);
    }
    Err(FaultKind::Refill)
}

fn entry_lo() -> impl Strategy<Value = EntryLo> {
    (0u64..0x1_0000, any::<bool>(), any::<bool>()).prop_map(|(pfn, dirty, valid)| lo(pfn, dirty, valid))
}

fn tlb_entry() -> impl Strategy<Value = TlbEntry> {
    (
        prop::sample::select(vec![0u64, 0x6000, 0x1e000, 0x7e000]),
        0u64..64,
        0u8..4,
        any::<bool>(),
        entry_lo(),
        entry_lo(),
    )
        .prop_map(|(page_mask, vpn2, asid, global, lo0, lo1)| TlbEntry {
            page_mask,
            vpn2,
            asid,
            global,
            lo: [lo0, lo1],
        })
}

proptest! {
    #[test]
    fn prop_lookup_matches_reference(
        entries in prop::collection::vec(tlb_entry(), 1..16),
        vaddr in 0u64..(64 << 13),
        asid in 0u8..4,
        write in any::<bool>(),
    ) {
        let mut tlb = Tlb::new(entries.len());
        for (i, e) in entries.iter().enumerate() {
            prop_assert!(tlb.write(i, *e));
        }
        let flags = if write { AccessFlags::WRITE } else { AccessFlags::READ };
        let got = tlb.lookup(vaddr, asid, flags).map(|m| m.paddr.val()).map_err(|f| f.kind);
        prop_assert_eq!(got, reference(&entries, vaddr, asid, write));

        let probe = tlb.probe(vaddr, asid);
        let hit = matches!(probe, Probe::Hit(_));
        prop_assert_eq!(hit, reference(&entries, vaddr, asid, false) != Err(FaultKind::Refill));
    }
}
