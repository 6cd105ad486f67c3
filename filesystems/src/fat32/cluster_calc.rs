// Cluster addressing for FAT32
// Pure arithmetic between cluster numbers and byte offsets in the image

use super::boot_sector::VolumeGeometry;
use super::constants::{FAT32_ENTRY_SIZE, FIRST_DATA_CLUSTER};

/// Byte offset of the first byte of `cluster` in the data region.
///
/// Only meaningful for `cluster >= 2`; callers validate the range first.
pub fn cluster_to_data_offset(geometry: &VolumeGeometry, cluster: u32) -> u64 {
    let bytes_per_sector = geometry.bytes_per_sector as u64;
    geometry.data_region_start_sector * bytes_per_sector
        + (cluster as u64 - FIRST_DATA_CLUSTER as u64) * geometry.bytes_per_cluster()
}

/// Byte offset of the cluster's 4-byte entry in the first FAT copy.
pub fn cluster_to_fat_entry_offset(geometry: &VolumeGeometry, cluster: u32) -> u64 {
    geometry.reserved_sector_count as u64 * geometry.bytes_per_sector as u64
        + cluster as u64 * FAT32_ENTRY_SIZE
}

/// Byte offset of sector `sector_index` within `cluster`.
pub fn cluster_sector_offset(geometry: &VolumeGeometry, cluster: u32, sector_index: u8) -> u64 {
    cluster_to_data_offset(geometry, cluster)
        + sector_index as u64 * geometry.bytes_per_sector as u64
}
