// Block device boundary for FAT32 images
// Reads are length-exact: a request either yields every byte or fails

use crate::error::DeviceError;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info, trace};

const SECTOR_SIZE: u64 = 512;

/// Byte-addressable, read-only view of a volume image.
pub trait BlockDevice {
    /// Read exactly `length` bytes starting at `offset`.
    fn read_exact_at(&self, offset: u64, length: u32) -> Result<Vec<u8>, DeviceError>;

    /// Size of the backing image in bytes.
    fn size(&self) -> u64;
}

impl<D: BlockDevice + ?Sized> BlockDevice for &D {
    fn read_exact_at(&self, offset: u64, length: u32) -> Result<Vec<u8>, DeviceError> {
        (**self).read_exact_at(offset, length)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    fn read_exact_at(&self, offset: u64, length: u32) -> Result<Vec<u8>, DeviceError> {
        (**self).read_exact_at(offset, length)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

fn check_bounds(offset: u64, length: u32, size: u64) -> Result<(), DeviceError> {
    let end = offset.checked_add(length as u64);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(DeviceError::ShortRead {
            offset,
            requested: length,
            got: size.saturating_sub(offset),
        }),
    }
}

/// An image file opened read-only, served through a bounded sector cache.
///
/// FAT entries and directory sectors are read over and over while walking
/// chains, so whole 512-byte sectors are cached and requests are assembled
/// from them. Runs of uncached sectors are fetched with a single read. When
/// the cache is full the oldest sector is evicted.
pub struct ImageFile {
    file: RefCell<File>,
    size: u64,
    sector_cache: RefCell<HashMap<u64, Vec<u8>>>,
    cache_order: RefCell<VecDeque<u64>>,
    max_cache_sectors: usize,
    disk_reads: Cell<u64>,
}

impl ImageFile {
    /// Open an image with the default cache limit (1000 sectors).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        Self::with_cache_limit(path, 1000)
    }

    pub fn with_cache_limit(
        path: impl AsRef<Path>,
        max_sectors: usize,
    ) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        info!("Opened image {} ({} bytes)", path.display(), size);

        Ok(Self {
            file: RefCell::new(file),
            size,
            sector_cache: RefCell::new(HashMap::new()),
            cache_order: RefCell::new(VecDeque::new()),
            max_cache_sectors: max_sectors,
            disk_reads: Cell::new(0),
        })
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.sector_cache.borrow().len(), self.max_cache_sectors)
    }

    /// Number of reads issued against the image file so far.
    pub fn disk_reads(&self) -> u64 {
        self.disk_reads.get()
    }

    fn cache_sector(&self, sector_num: u64, data: &[u8]) {
        if self.max_cache_sectors == 0 {
            return;
        }

        let mut cache = self.sector_cache.borrow_mut();
        let mut order = self.cache_order.borrow_mut();
        while cache.len() >= self.max_cache_sectors {
            match order.pop_front() {
                Some(oldest) => {
                    cache.remove(&oldest);
                }
                None => break,
            }
        }
        if cache.insert(sector_num, data.to_vec()).is_none() {
            order.push_back(sector_num);
        }
    }

    /// Read `count` sectors from `start_sector`, going to the file once per run
    /// of uncached sectors. The final sector of an image whose size is not
    /// sector-aligned comes back short.
    fn read_sectors(&self, start_sector: u64, count: u64) -> Result<Vec<u8>, DeviceError> {
        let end_sector = start_sector + count;
        let mut result = Vec::with_capacity((count * SECTOR_SIZE) as usize);
        let mut current = start_sector;

        while current < end_sector {
            if let Some(cached) = self.sector_cache.borrow().get(&current) {
                trace!("Sector {} found in cache", current);
                result.extend_from_slice(cached);
                current += 1;
                continue;
            }

            let mut run_end = current + 1;
            while run_end < end_sector && !self.sector_cache.borrow().contains_key(&run_end) {
                run_end += 1;
            }

            let offset = current * SECTOR_SIZE;
            let wanted = (run_end * SECTOR_SIZE).min(self.size) - offset;
            debug!(
                "Reading {} contiguous sectors from image at offset {:#x}",
                run_end - current,
                offset
            );

            let mut buffer = vec![0u8; wanted as usize];
            {
                let mut file = self.file.borrow_mut();
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut buffer)?;
            }
            self.disk_reads.set(self.disk_reads.get() + 1);

            for (i, sector) in buffer.chunks(SECTOR_SIZE as usize).enumerate() {
                self.cache_sector(current + i as u64, sector);
            }
            result.extend_from_slice(&buffer);
            current = run_end;
        }

        Ok(result)
    }
}

impl BlockDevice for ImageFile {
    fn read_exact_at(&self, offset: u64, length: u32) -> Result<Vec<u8>, DeviceError> {
        if length == 0 {
            return Ok(Vec::new());
        }
        check_bounds(offset, length, self.size)?;

        let end_byte = offset + length as u64;
        let start_sector = offset / SECTOR_SIZE;
        let end_sector = end_byte.div_ceil(SECTOR_SIZE);
        trace!(
            "Reading {} bytes at offset {:#x} (sectors {}..{})",
            length,
            offset,
            start_sector,
            end_sector
        );

        let all_data = self.read_sectors(start_sector, end_sector - start_sector)?;
        let start = (offset - start_sector * SECTOR_SIZE) as usize;
        Ok(all_data[start..start + length as usize].to_vec())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// An image held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    data: Vec<u8>,
}

impl MemoryImage {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for MemoryImage {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl BlockDevice for MemoryImage {
    fn read_exact_at(&self, offset: u64, length: u32) -> Result<Vec<u8>, DeviceError> {
        check_bounds(offset, length, self.data.len() as u64)?;
        let start = offset as usize;
        Ok(self.data[start..start + length as usize].to_vec())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
