//! Physical System Memory (RAM).
//!
//! This module implements the main system memory device: a zero-initialized
//! byte vector mapped at a physical base address. Accesses that run past the
//! end of the buffer read as zero and drop writes, matching an unclaimed bus.

use crate::soc::traits::Device;

/// System RAM device.
#[derive(Debug)]
pub struct Memory {
    /// Backing storage.
    data: Vec<u8>,
    /// The base physical address where this memory is mapped.
    base_addr: u64,
}

impl Memory {
    /// Creates a zero-filled RAM region.
    ///
    /// # Arguments
    ///
    /// * `base_addr` - Starting physical address.
    /// * `size` - Size in bytes.
    pub fn new(base_addr: u64, size: usize) -> Self {
        Self {
            data: vec![0; size],
            base_addr,
        }
    }

    /// Loads a byte slice into memory at a specific offset.
    ///
    /// # Returns
    ///
    /// `false` if the slice does not fit; memory is left untouched in that case.
    pub fn load(&mut self, data: &[u8], offset: usize) -> bool {
        match offset
            .checked_add(data.len())
            .and_then(|end| self.data.get_mut(offset..end))
        {
            Some(dst) => {
                dst.copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    fn bytes<const N: usize>(&self, offset: u64) -> [u8; N] {
        let start = offset as usize;
        start
            .checked_add(N)
            .and_then(|end| self.data.get(start..end))
            .and_then(|s| s.try_into().ok())
            .unwrap_or([0; N])
    }

    #[inline(always)]
    fn put<const N: usize>(&mut self, offset: u64, bytes: [u8; N]) {
        let start = offset as usize;
        if let Some(dst) = start
            .checked_add(N)
            .and_then(|end| self.data.get_mut(start..end))
        {
            dst.copy_from_slice(&bytes);
        }
    }
}

impl Device for Memory {
    fn name(&self) -> &str {
        "RAM"
    }

    fn address_range(&self) -> (u64, u64) {
        (self.base_addr, self.data.len() as u64)
    }

    fn read_u8(&mut self, offset: u64) -> u8 {
        self.data.get(offset as usize).copied().unwrap_or(0)
    }

    fn read_u16(&mut self, offset: u64) -> u16 {
        u16::from_le_bytes(self.bytes(offset))
    }

    fn read_u32(&mut self, offset: u64) -> u32 {
        u32::from_le_bytes(self.bytes(offset))
    }

    fn read_u64(&mut self, offset: u64) -> u64 {
        u64::from_le_bytes(self.bytes(offset))
    }

    fn write_u8(&mut self, offset: u64, val: u8) {
        if let Some(b) = self.data.get_mut(offset as usize) {
            *b = val;
        }
    }

    fn write_u16(&mut self, offset: u64, val: u16) {
        self.put(offset, val.to_le_bytes());
    }

    fn write_u32(&mut self, offset: u64, val: u32) {
        self.put(offset, val.to_le_bytes());
    }

    fn write_u64(&mut self, offset: u64, val: u64) {
        self.put(offset, val.to_le_bytes());
    }

    fn write_bytes(&mut self, offset: u64, data: &[u8]) {
        let _ = self.load(data, offset as usize);
    }
}
