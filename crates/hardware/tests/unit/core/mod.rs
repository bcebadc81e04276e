/// Translation cache behaviour: decode-once, resets, capacity flushes, page crossing.
pub mod dyntrans;



/// TLB lookups against a reference model.
pub mod tlb;
