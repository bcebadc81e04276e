pub mod exceptions;
pub mod interrupts;
pub mod tlb;
