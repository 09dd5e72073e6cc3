#![allow(dead_code)]

use std::cell::UnsafeCell;
use std::collections::BTreeMap;

use kernel_alloc::{Frame, MemoryLayout, PageAllocator, PhysMapper};
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_vmem::{MAXVA, MapError, PageTable, PageTableEntry};

pub const BASE: u64 = 0x8000_0000;

/// Three frames of kernel image (the last one partial) and 13 free frames.
pub fn small_layout() -> MemoryLayout {
    MemoryLayout::new(
        PhysicalAddress::new(BASE),
        PhysicalAddress::new(BASE + 2 * PAGE_SIZE + 0x10),
        PhysicalAddress::new(BASE + 16 * PAGE_SIZE),
    )
    .unwrap()
}

pub fn small_allocator() -> PageAllocator<RamMapper> {
    let layout = small_layout();
    PageAllocator::new(layout, RamMapper::new(&layout))
}

/// Simulated physical RAM backing every frame of a layout.
pub struct RamMapper {
    base: u64,
    frames: Box<[UnsafeCell<Frame>]>,
}

// Safety: frames are only handed out under the allocator's ownership rules.
unsafe impl Sync for RamMapper {}

impl RamMapper {
    pub fn new(layout: &MemoryLayout) -> Self {
        let frames = (0..layout.frame_count())
            .map(|_| UnsafeCell::new(Frame::zeroed()))
            .collect();
        Self {
            base: layout.kernel_base().as_u64(),
            frames,
        }
    }

    pub fn bytes(&self, pa: PhysicalAddress) -> Vec<u8> {
        let frame: &mut Frame = unsafe { self.phys_to_mut(pa.page_round_down()) };
        frame.0.to_vec()
    }

    pub fn fill(&self, pa: PhysicalAddress, byte: u8) {
        let frame: &mut Frame = unsafe { self.phys_to_mut(pa.page_round_down()) };
        frame.0.fill(byte);
    }
}

impl PhysMapper for RamMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let offset = pa.as_u64() - self.base;
        let frame = self.frames[(offset / PAGE_SIZE) as usize].get();
        unsafe {
            &mut *frame
                .cast::<u8>()
                .add((offset % PAGE_SIZE) as usize)
                .cast::<T>()
        }
    }
}

/// Single-level page table keyed by page-aligned virtual address.
#[derive(Default)]
pub struct MockPageTable {
    entries: BTreeMap<u64, PageTableEntry>,
    pub fail_map: bool,
    pub map_calls: usize,
}

impl MockPageTable {
    pub fn map_user(&mut self, va: u64, pa: PhysicalAddress, writable: bool) {
        let flags = PageTableEntry::new()
            .with_readable(true)
            .with_writable(writable)
            .with_user(true);
        self.map_pages(VirtualAddress::new(va), PAGE_SIZE, pa, flags)
            .unwrap();
    }

    pub fn entry(&self, va: u64) -> PageTableEntry {
        self.walk(VirtualAddress::new(va)).unwrap()
    }

    pub fn walk_mut_entry(&mut self, va: u64) -> &mut PageTableEntry {
        self.walk_mut(VirtualAddress::new(va)).unwrap()
    }
}

impl PageTable for MockPageTable {
    fn walk(&self, va: VirtualAddress) -> Option<PageTableEntry> {
        assert!(va.as_u64() < MAXVA, "walk beyond MAXVA");
        self.entries.get(&va.page_round_down().as_u64()).copied()
    }

    fn walk_mut(&mut self, va: VirtualAddress) -> Option<&mut PageTableEntry> {
        assert!(va.as_u64() < MAXVA, "walk beyond MAXVA");
        self.entries.get_mut(&va.page_round_down().as_u64())
    }

    fn map_pages(
        &mut self,
        va: VirtualAddress,
        size: u64,
        pa: PhysicalAddress,
        flags: PageTableEntry,
    ) -> Result<(), MapError> {
        self.map_calls += 1;
        if self.fail_map {
            return Err(MapError::OutOfMemory);
        }
        let first = va.page_round_down().as_u64();
        let last = (va + (size - 1)).page_round_down().as_u64();
        let mut page = first;
        let mut frame = pa;
        while page <= last {
            if self.entries.get(&page).is_some_and(|e| e.valid()) {
                return Err(MapError::Remap(VirtualAddress::new(page)));
            }
            let entry = flags.with_valid(true).with_physical_address(frame);
            self.entries.insert(page, entry);
            page += PAGE_SIZE;
            frame += PAGE_SIZE;
        }
        Ok(())
    }
}
