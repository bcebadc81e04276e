//! # Image Loader Tests
//!
//! ELF images are built by hand: one 32-bit header and one `PT_LOAD`
//! program header, little-endian unless a test asks otherwise.

use std::io::Write;
use std::path::Path;

use crate::common::asm::mips::*;
use crate::common::harness::TEST_RAM;
use dtemu_core::common::SimError;
use dtemu_core::sim::loader::{load_elf, load_elf_file, load_raw, load_raw_file};
use dtemu_core::soc::{Bus, Memory};
use dtemu_core::{I960, Mips};
use pretty_assertions::assert_eq;

fn ram() -> Bus {
    let mut bus = Bus::new();
    bus.add_device(Box::new(Memory::new(0, TEST_RAM as usize)));
    bus
}

struct Segment {
    vaddr: u32,
    data: Vec<u8>,
    memsz: u32,
}

/// Builds an ELF32 executable for MIPS with one loadable segment.
fn elf32(big_endian: bool, entry: u32, seg: &Segment) -> Vec<u8> {
    let h = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let w = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let data_off = 52 + 32;

    let mut out = vec![0x7f, b'E', b'L', b'F', 1, if big_endian { 2 } else { 1 }, 1, 0];
    out.resize(16, 0);
    out.extend(h(2)); // ET_EXEC
    out.extend(h(8)); // EM_MIPS
    out.extend(w(1));
    out.extend(w(entry));
    out.extend(w(52)); // e_phoff
    out.extend(w(0)); // e_shoff
    out.extend(w(0)); // e_flags
    out.extend(h(52));
    out.extend(h(32));
    out.extend(h(1));
    out.extend(h(40));
    out.extend(h(0));
    out.extend(h(0));

    out.extend(w(1)); // PT_LOAD
    out.extend(w(data_off));
    out.extend(w(seg.vaddr));
    out.extend(w(seg.vaddr & 0x1fff_ffff));
    out.extend(w(seg.data.len() as u32));
    out.extend(w(seg.memsz));
    out.extend(w(5));
    out.extend(w(4));
    assert_eq!(out.len(), data_off as usize);

    out.extend(&seg.data);
    out
}

fn program_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn test_elf_segment_goes_to_physical_address() {
    let mut bus = ram();
    // Stale bytes where the zero-filled tail lands.
    bus.write_u32(0x2008, 0xdead_beef);
    bus.write_u32(0x200c, 0xdead_beef);
    let image = elf32(
        false,
        0x8000_2000,
        &Segment {
            vaddr: 0x8000_2000,
            data: program_bytes(&[addiu(1, 0, 3), NOP]),
            memsz: 16,
        },
    );

    assert_eq!(load_elf::<Mips>(&mut bus, &image).unwrap(), 0x8000_2000);
    assert_eq!(bus.read_u32(0x2000), addiu(1, 0, 3));
    assert_eq!(bus.read_u32(0x2004), NOP);
    assert_eq!(bus.read_u32(0x2008), 0);
    assert_eq!(bus.read_u32(0x200c), 0);
}

#[test]
fn test_identity_mapped_guest_loads_at_link_address() {
    let mut bus = ram();
    let image = elf32(
        false,
        0x3000,
        &Segment {
            vaddr: 0x3000,
            data: vec![1, 2, 3, 4],
            memsz: 4,
        },
    );

    assert_eq!(load_elf::<I960>(&mut bus, &image).unwrap(), 0x3000);
    assert_eq!(bus.read_u32(0x3000), 0x0403_0201);
}

#[test]
fn test_segment_past_memory_is_rejected() {
    let mut bus = ram();
    let image = elf32(
        false,
        0,
        &Segment {
            vaddr: 0x800f_fff8,
            data: vec![0; 8],
            memsz: 16,
        },
    );

    assert!(matches!(
        load_elf::<Mips>(&mut bus, &image),
        Err(SimError::ImageOutOfRange {
            addr: 0xf_fff8,
            len: 16
        })
    ));
}

#[test]
fn test_big_endian_image_is_unsupported() {
    let mut bus = ram();
    let image = elf32(
        true,
        0x8000_2000,
        &Segment {
            vaddr: 0x8000_2000,
            data: vec![0; 4],
            memsz: 4,
        },
    );

    assert!(matches!(
        load_elf::<Mips>(&mut bus, &image),
        Err(SimError::UnsupportedImage(_))
    ));
    assert_eq!(bus.read_u32(0x2000), 0);
}

#[test]
fn test_garbage_is_not_an_image() {
    let mut bus = ram();
    let err = load_elf::<Mips>(&mut bus, b"definitely not an executable").unwrap_err();
    assert!(matches!(err, SimError::Elf(_)));
    assert!(err.to_string().starts_with("malformed ELF image"));
}

#[test]
fn test_raw_image_round_trip_through_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&program_bytes(&[0x1111_1111, 0x2222_2222])).unwrap();
    file.flush().unwrap();

    let mut bus = ram();
    load_raw_file(&mut bus, file.path(), 0x3000).unwrap();
    assert_eq!(bus.read_u32(0x3000), 0x1111_1111);
    assert_eq!(bus.read_u32(0x3004), 0x2222_2222);
}

#[test]
fn test_raw_image_must_fit() {
    let mut bus = ram();
    assert!(matches!(
        load_raw(&mut bus, &[0; 8], TEST_RAM - 4),
        Err(SimError::ImageOutOfRange { len: 8, .. })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let mut bus = ram();
    let path = Path::new("/nonexistent/dtemu/image.elf");
    assert!(matches!(
        load_elf_file::<Mips>(&mut bus, path),
        Err(SimError::Io(_))
    ));
    assert!(matches!(
        load_raw_file(&mut bus, path, 0),
        Err(SimError::Io(_))
    ));
}
