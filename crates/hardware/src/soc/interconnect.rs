//! System interconnect (bus) for memory and MMIO access.
//!
//! This module implements the bus that routes physical address accesses to devices. It provides:
//! 1. **Device registration:** Devices are added by address range and sorted for lookup.
//! 2. **Access routing:** Read/write by address with a last-device hint for throughput.
//! 3. **Backing checks:** `is_valid_address` lets instruction fetch reject unbacked addresses.
//! 4. **Image loading:** Bulk writes used by the loader.

use std::fmt;

use super::traits::Device;

/// System bus connecting CPUs and devices; routes accesses by physical address.
///
/// The bus is owned by the machine and shared by every CPU in turn; CPUs run
/// one at a time, so no locking is involved.
#[derive(Default)]
pub struct Bus {
    /// Registered devices, sorted by base address.
    devices: Vec<Box<dyn Device>>,
    last_device_idx: usize,
    ram_idx: Option<usize>,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for dev in &self.devices {
            let (base, size) = dev.address_range();
            let _ = list.entry(&format_args!("{} @ {:#x}+{:#x}", dev.name(), base, size));
        }
        list.finish()
    }
}

impl Bus {
    /// Creates an empty bus; add devices with `add_device`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device on the bus; devices are sorted by base address for lookup.
    ///
    /// # Arguments
    ///
    /// * `dev` - The device to add.
    pub fn add_device(&mut self, dev: Box<dyn Device>) {
        self.devices.push(dev);
        self.devices.sort_by_key(|d| d.address_range().0);
        self.ram_idx = self.devices.iter().position(|d| d.name() == "RAM");
        self.last_device_idx = 0;
    }

    /// Writes a binary blob into memory at the given physical address.
    ///
    /// # Arguments
    ///
    /// * `data` - Bytes to write.
    /// * `addr` - Physical base address.
    ///
    /// # Returns
    ///
    /// `false` if no single device backs the whole range; nothing is written then.
    pub fn load_binary_at(&mut self, data: &[u8], addr: u64) -> bool {
        if let Some((dev, offset)) = self.find_device(addr) {
            let (_, size) = dev.address_range();
            if offset + (data.len() as u64) <= size {
                dev.write_bytes(offset, data);
                return true;
            }
        }
        false
    }

    /// Reads `len` bytes starting at a physical address.
    ///
    /// # Returns
    ///
    /// `None` if any byte of the range is unbacked.
    pub fn read_bytes(&mut self, paddr: u64, len: usize) -> Option<Vec<u8>> {
        let mut buf = vec![0; len];
        let (dev, offset) = self.find_device(paddr)?;
        let (_, size) = dev.address_range();
        if offset + len as u64 > size {
            return None;
        }
        dev.read_bytes(offset, &mut buf);
        Some(buf)
    }

    /// Returns whether the given physical address is backed by any device.
    ///
    /// # Arguments
    ///
    /// * `paddr` - Physical address to check.
    ///
    /// # Returns
    ///
    /// `true` if some device's range contains `paddr`.
    pub fn is_valid_address(&self, paddr: u64) -> bool {
        let contains = |dev: &dyn Device| {
            let (start, size) = dev.address_range();
            paddr >= start && paddr - start < size
        };
        if let Some(dev) = self.ram_idx.and_then(|idx| self.devices.get(idx)) {
            if contains(dev.as_ref()) {
                return true;
            }
        }
        self.devices.iter().any(|dev| contains(dev.as_ref()))
    }

    fn find_device(&mut self, paddr: u64) -> Option<(&mut Box<dyn Device>, u64)> {
        let hit = |dev: &dyn Device| {
            let (start, size) = dev.address_range();
            (paddr >= start && paddr - start < size).then_some(paddr - start)
        };

        let mut found = None;
        for idx in [Some(self.last_device_idx), self.ram_idx].into_iter().flatten() {
            if let Some(offset) = self.devices.get(idx).and_then(|d| hit(d.as_ref())) {
                found = Some((idx, offset));
                break;
            }
        }
        if found.is_none() {
            found = self
                .devices
                .iter()
                .enumerate()
                .find_map(|(i, d)| hit(d.as_ref()).map(|off| (i, off)));
        }

        let (idx, offset) = found?;
        self.last_device_idx = idx;
        self.devices.get_mut(idx).map(|dev| (dev, offset))
    }

    /// Reads one byte at the given physical address; returns 0 if no device claims the address.
    pub fn read_u8(&mut self, paddr: u64) -> u8 {
        self.find_device(paddr)
            .map_or(0, |(dev, offset)| dev.read_u8(offset))
    }
    /// Reads two bytes (little-endian) at the given physical address; returns 0 if unclaimed.
    pub fn read_u16(&mut self, paddr: u64) -> u16 {
        self.find_device(paddr)
            .map_or(0, |(dev, offset)| dev.read_u16(offset))
    }
    /// Reads four bytes (little-endian) at the given physical address; returns 0 if unclaimed.
    pub fn read_u32(&mut self, paddr: u64) -> u32 {
        self.find_device(paddr)
            .map_or(0, |(dev, offset)| dev.read_u32(offset))
    }
    /// Reads eight bytes (little-endian) at the given physical address; returns 0 if unclaimed.
    pub fn read_u64(&mut self, paddr: u64) -> u64 {
        self.find_device(paddr)
            .map_or(0, |(dev, offset)| dev.read_u64(offset))
    }
    /// Writes one byte at the given physical address; no-op if no device claims it.
    pub fn write_u8(&mut self, paddr: u64, val: u8) {
        if let Some((dev, offset)) = self.find_device(paddr) {
            dev.write_u8(offset, val);
        }
    }
    /// Writes two bytes (little-endian) at the given physical address; no-op if unclaimed.
    pub fn write_u16(&mut self, paddr: u64, val: u16) {
        if let Some((dev, offset)) = self.find_device(paddr) {
            dev.write_u16(offset, val);
        }
    }
    /// Writes four bytes (little-endian) at the given physical address; no-op if unclaimed.
    pub fn write_u32(&mut self, paddr: u64, val: u32) {
        if let Some((dev, offset)) = self.find_device(paddr) {
            dev.write_u32(offset, val);
        }
    }
    /// Writes eight bytes (little-endian) at the given physical address; no-op if unclaimed.
    pub fn write_u64(&mut self, paddr: u64, val: u64) {
        if let Some((dev, offset)) = self.find_device(paddr) {
            dev.write_u64(offset, val);
        }
    }
}
