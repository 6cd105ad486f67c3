// Test helpers for building synthetic FAT32 images in memory

use crate::fat32::constants::*;
use fatnav_core::MemoryImage;
use std::collections::BTreeMap;

pub const EOC: u32 = 0x0FFF_FFFF;

/// Build a 32-byte short directory entry.
pub fn dir_entry(name: &[u8; 11], attributes: u8, first_cluster: u32, size: u32) -> [u8; 32] {
    dir_entry_with_time(name, attributes, first_cluster, size, 0, 0)
}

pub fn dir_entry_with_time(
    name: &[u8; 11],
    attributes: u8,
    first_cluster: u32,
    size: u32,
    write_date: u16,
    write_time: u16,
) -> [u8; 32] {
    let mut entry = [0u8; 32];
    entry[DIR_NAME..DIR_NAME + 11].copy_from_slice(name);
    entry[DIR_ATTR] = attributes;
    let high = (first_cluster >> 16) as u16;
    entry[DIR_FST_CLUS_HI..DIR_FST_CLUS_HI + 2].copy_from_slice(&high.to_le_bytes());
    entry[DIR_WRT_TIME..DIR_WRT_TIME + 2].copy_from_slice(&write_time.to_le_bytes());
    entry[DIR_WRT_DATE..DIR_WRT_DATE + 2].copy_from_slice(&write_date.to_le_bytes());
    let low = first_cluster as u16;
    entry[DIR_FST_CLUS_LO..DIR_FST_CLUS_LO + 2].copy_from_slice(&low.to_le_bytes());
    entry[DIR_FILE_SIZE..DIR_FILE_SIZE + 4].copy_from_slice(&size.to_le_bytes());
    entry
}

pub fn file_entry(name: &[u8; 11], first_cluster: u32, size: u32) -> [u8; 32] {
    dir_entry(name, ATTR_ARCHIVE, first_cluster, size)
}

pub fn subdir_entry(name: &[u8; 11], first_cluster: u32) -> [u8; 32] {
    dir_entry(name, ATTR_DIRECTORY, first_cluster, 0)
}

pub fn deleted_entry(name: &[u8; 11]) -> [u8; 32] {
    let mut entry = file_entry(name, 0, 0);
    entry[0] = DIR_ENTRY_DELETED;
    entry
}

pub fn long_name_fragment() -> [u8; 32] {
    let mut entry = [0xFFu8; 32];
    entry[0] = 0x41;
    entry[DIR_ATTR] = ATTR_LONG_NAME;
    entry
}

/// Synthetic FAT32 image: 512-byte sectors, 32 reserved sectors,
/// one 8-sector FAT and root directory at cluster 2 unless overridden.
pub struct ImageBuilder {
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    num_fats: u8,
    sectors_per_fat: u32,
    total_sectors: u32,
    root_cluster: u32,
    label: Option<String>,
    signature: bool,
    fat: BTreeMap<u32, u32>,
    writes: Vec<(Location, Vec<u8>)>,
    truncate: Option<usize>,
}

/// Cluster and byte offset within it.
type Location = (u32, usize);

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 32,
            num_fats: 1,
            sectors_per_fat: 8,
            total_sectors: 40 + 64,
            root_cluster: 2,
            label: None,
            signature: true,
            fat: BTreeMap::new(),
            writes: Vec::new(),
            truncate: None,
        }
    }

    pub fn sectors_per_cluster(mut self, value: u8) -> Self {
        self.sectors_per_cluster = value;
        self
    }

    pub fn num_fats(mut self, value: u8) -> Self {
        self.num_fats = value;
        self
    }

    pub fn total_sectors(mut self, value: u32) -> Self {
        self.total_sectors = value;
        self
    }

    pub fn root_cluster(mut self, value: u32) -> Self {
        self.root_cluster = value;
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn without_signature(mut self) -> Self {
        self.signature = false;
        self
    }

    pub fn truncate_to(mut self, len: usize) -> Self {
        self.truncate = Some(len);
        self
    }

    /// Set a raw FAT entry.
    pub fn fat_entry(mut self, cluster: u32, value: u32) -> Self {
        self.fat.insert(cluster, value);
        self
    }

    /// Link the clusters in order and terminate the last one.
    pub fn chain(mut self, clusters: &[u32]) -> Self {
        for pair in clusters.windows(2) {
            self.fat.insert(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.fat.insert(last, EOC);
        }
        self
    }

    /// Write directory entries sequentially from the start of `cluster`.
    pub fn entries(mut self, cluster: u32, entries: &[[u8; 32]]) -> Self {
        let bytes: Vec<u8> = entries.iter().flatten().copied().collect();
        self.writes.push(((cluster, 0), bytes));
        self
    }

    /// Write a directory entry at slot `index` of `cluster`.
    pub fn entry_at(mut self, cluster: u32, index: usize, entry: [u8; 32]) -> Self {
        self.writes.push(((cluster, index * DIR_ENTRY_SIZE), entry.to_vec()));
        self
    }

    /// Write raw bytes from the start of `cluster`.
    pub fn data(mut self, cluster: u32, bytes: &[u8]) -> Self {
        self.writes.push(((cluster, 0), bytes.to_vec()));
        self
    }

    fn cluster_offset(&self, cluster: u32) -> usize {
        let data_start = self.reserved_sectors as usize
            + self.num_fats as usize * self.sectors_per_fat as usize;
        let bytes_per_cluster =
            self.bytes_per_sector as usize * self.sectors_per_cluster.max(1) as usize;
        data_start * self.bytes_per_sector as usize + (cluster as usize - 2) * bytes_per_cluster
    }

    pub fn build_bytes(&self) -> Vec<u8> {
        let full_len = self.total_sectors as usize * self.bytes_per_sector as usize;
        let mut image = vec![0u8; self.truncate.unwrap_or(full_len).max(512)];

        let mut boot = [0u8; 512];
        boot[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        boot[3..11].copy_from_slice(b"FATNAV  ");
        boot[11..13].copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        boot[13] = self.sectors_per_cluster;
        boot[14..16].copy_from_slice(&self.reserved_sectors.to_le_bytes());
        boot[16] = self.num_fats;
        boot[32..36].copy_from_slice(&self.total_sectors.to_le_bytes());
        boot[36..40].copy_from_slice(&self.sectors_per_fat.to_le_bytes());
        boot[44..48].copy_from_slice(&self.root_cluster.to_le_bytes());
        let mut label = [b' '; 11];
        let text = self.label.as_deref().unwrap_or("NO NAME");
        label[..text.len().min(11)].copy_from_slice(&text.as_bytes()[..text.len().min(11)]);
        boot[71..82].copy_from_slice(&label);
        boot[82..90].copy_from_slice(b"FAT32   ");
        if self.signature {
            boot[510..512].copy_from_slice(&BOOT_SIGNATURE);
        }
        put(&mut image, 0, &boot);

        let mut fat = BTreeMap::new();
        fat.insert(0, 0x0FFF_FFF8);
        fat.insert(1, EOC);
        fat.insert(self.root_cluster, EOC);
        fat.extend(self.fat.iter().map(|(k, v)| (*k, *v)));

        for copy in 0..self.num_fats.max(1) as usize {
            let fat_start = (self.reserved_sectors as usize
                + copy * self.sectors_per_fat as usize)
                * self.bytes_per_sector as usize;
            for (cluster, value) in &fat {
                put(&mut image, fat_start + *cluster as usize * 4, &value.to_le_bytes());
            }
        }

        for (location, bytes) in &self.writes {
            let (cluster, within) = *location;
            let offset = self.cluster_offset(cluster) + within;
            put(&mut image, offset, bytes);
        }

        if let Some(len) = self.truncate {
            image.truncate(len);
        }
        image
    }

    pub fn build(&self) -> MemoryImage {
        MemoryImage::new(self.build_bytes())
    }
}

fn put(image: &mut Vec<u8>, offset: usize, bytes: &[u8]) {
    if image.len() < offset + bytes.len() {
        image.resize(offset + bytes.len(), 0);
    }
    image[offset..offset + bytes.len()].copy_from_slice(bytes);
}
