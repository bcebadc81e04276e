//! Guest image loading.
//!
//! This module places guest code into physical memory before the first burst. It provides:
//! 1. **Raw images:** Flat binaries copied to a caller-chosen physical address.
//! 2. **ELF images:** Loadable segments placed at the architecture's physical
//!    address for their link address; the entry point is returned.
//! 3. **File helpers:** Read an image from disk and load it in one step.
//!
//! Loading writes the bus directly. Translation caches are not consulted, so
//! images must be loaded before CPUs run or followed by a cache reset.

use std::fs;
use std::path::Path;

use object::{Object, ObjectSegment};
use tracing::{debug, info};

use crate::common::SimError;
use crate::isa::Arch;
use crate::soc::Bus;

/// Copies `bytes` to physical address `paddr`.
///
/// # Errors
///
/// `SimError::ImageOutOfRange` if no single device backs the whole range.
pub fn load_raw(bus: &mut Bus, bytes: &[u8], paddr: u64) -> Result<(), SimError> {
    if !bus.load_binary_at(bytes, paddr) {
        return Err(SimError::ImageOutOfRange {
            addr: paddr,
            len: bytes.len(),
        });
    }
    info!(addr = format_args!("{paddr:#x}"), len = bytes.len(), "raw image loaded");
    Ok(())
}

/// Loads the `PT_LOAD` segments of an ELF image and returns its entry point.
///
/// Each segment's link address goes through [`Arch::image_paddr`]; the bytes
/// between file size and memory size are zeroed.
///
/// # Errors
///
/// * `SimError::Elf` if the image cannot be parsed.
/// * `SimError::ImageOutOfRange` if a segment does not fit in backed memory.
pub fn load_elf<A: Arch>(bus: &mut Bus, bytes: &[u8]) -> Result<u64, SimError> {
    let file = object::File::parse(bytes)?;
    if !file.is_little_endian() {
        return Err(SimError::UnsupportedImage("big-endian ELF"));
    }

    for segment in file.segments() {
        let data = segment.data()?;
        let vaddr = segment.address();
        let paddr = A::image_paddr(vaddr);
        let mem_len = usize::try_from(segment.size()).unwrap_or(usize::MAX);
        if mem_len == 0 {
            continue;
        }
        let last = paddr.checked_add(segment.size() - 1);
        if data.len() > mem_len || !last.is_some_and(|a| bus.is_valid_address(a)) {
            return Err(SimError::ImageOutOfRange {
                addr: paddr,
                len: mem_len,
            });
        }
        let mut image = data.to_vec();
        image.resize(mem_len, 0);
        load_raw(bus, &image, paddr)?;
        debug!(
            vaddr = format_args!("{vaddr:#x}"),
            paddr = format_args!("{paddr:#x}"),
            filesz = data.len(),
            memsz = mem_len,
            "segment loaded"
        );
    }

    let entry = file.entry();
    info!(arch = A::NAME, entry = format_args!("{entry:#x}"), "elf image loaded");
    Ok(entry)
}

/// Reads a flat binary from disk and loads it at `paddr`.
pub fn load_raw_file(bus: &mut Bus, path: &Path, paddr: u64) -> Result<(), SimError> {
    let bytes = fs::read(path)?;
    load_raw(bus, &bytes, paddr)
}

/// Reads an ELF image from disk and loads it. Returns the entry point.
pub fn load_elf_file<A: Arch>(bus: &mut Bus, path: &Path) -> Result<u64, SimError> {
    let bytes = fs::read(path)?;
    load_elf::<A>(bus, &bytes)
}
