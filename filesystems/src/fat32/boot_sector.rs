// FAT32 boot sector parsing
// Decodes the BIOS Parameter Block field by field into VolumeGeometry

use super::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use fatnav_core::{BlockDevice, DeviceError, ParseError};
use log::{info, warn};
use std::fmt;

/// Volume layout decoded from the BPB. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sector_count: u16,
    pub num_fats: u8,
    pub sectors_per_fat: u32,
    pub total_sectors: u32,
    pub root_cluster: u32,

    // Derived
    pub data_region_start_sector: u64,
    pub total_data_sectors: u64,
    pub total_cluster_count: u32,
    pub entries_per_fat: u64,
}

impl VolumeGeometry {
    /// Build geometry from raw BPB values, deriving the data region layout.
    pub fn from_fields(
        bytes_per_sector: u16,
        sectors_per_cluster: u8,
        reserved_sector_count: u16,
        num_fats: u8,
        sectors_per_fat: u32,
        total_sectors: u32,
        root_cluster: u32,
    ) -> Result<Self, ParseError> {
        if bytes_per_sector == 0 || sectors_per_cluster == 0 {
            return Err(ParseError::DegenerateGeometry {
                bytes_per_sector,
                sectors_per_cluster,
            });
        }

        let data_region_start_sector =
            reserved_sector_count as u64 + num_fats as u64 * sectors_per_fat as u64;

        if (total_sectors as u64) < data_region_start_sector {
            warn!(
                "Total sectors ({}) smaller than metadata area ({} sectors); no data region",
                total_sectors, data_region_start_sector
            );
        }

        let total_data_sectors = (total_sectors as u64).saturating_sub(data_region_start_sector);
        let total_cluster_count =
            u32::try_from(total_data_sectors / sectors_per_cluster as u64).unwrap_or(u32::MAX);
        let entries_per_fat = sectors_per_fat as u64 * bytes_per_sector as u64 / FAT32_ENTRY_SIZE;

        if total_cluster_count as u64 + FIRST_DATA_CLUSTER as u64 > entries_per_fat {
            warn!(
                "FAT holds {} entries for {} data clusters; clusters past the FAT are unusable",
                entries_per_fat, total_cluster_count
            );
        }

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sector_count,
            num_fats,
            sectors_per_fat,
            total_sectors,
            root_cluster,
            data_region_start_sector,
            total_data_sectors,
            total_cluster_count,
            entries_per_fat,
        })
    }

    /// Bytes in one cluster.
    pub fn bytes_per_cluster(&self) -> u64 {
        self.bytes_per_sector as u64 * self.sectors_per_cluster as u64
    }

    /// Highest cluster number that addresses the data region and has an
    /// entry inside the first FAT.
    pub fn max_valid_cluster(&self) -> u32 {
        let last_fat_entry =
            u32::try_from(self.entries_per_fat.saturating_sub(1)).unwrap_or(u32::MAX);
        self.total_cluster_count
            .saturating_add(1)
            .min(last_fat_entry)
            .min(FAT32_MAX_CLUSTER)
    }

    pub fn is_valid_cluster(&self, cluster: u32) -> bool {
        cluster >= FIRST_DATA_CLUSTER && cluster <= self.max_valid_cluster()
    }
}

fn read_field<D: BlockDevice + ?Sized>(
    device: &D,
    offset: u64,
    length: u32,
    field: &'static str,
) -> Result<Vec<u8>, ParseError> {
    device.read_exact_at(offset, length).map_err(|e| match e {
        DeviceError::ShortRead { .. } => ParseError::Truncated(field),
        other => ParseError::Device(other),
    })
}

/// Parse the boot sector of `device` into a [`VolumeGeometry`].
pub fn parse<D: BlockDevice + ?Sized>(device: &D) -> Result<VolumeGeometry, ParseError> {
    let bytes_per_sector =
        LittleEndian::read_u16(&read_field(device, BPB_BYTES_PER_SEC, 2, "bytes per sector")?);
    let sectors_per_cluster = read_field(device, BPB_SEC_PER_CLUS, 1, "sectors per cluster")?[0];
    let reserved_sector_count =
        LittleEndian::read_u16(&read_field(device, BPB_RSVD_SEC_CNT, 2, "reserved sector count")?);
    let num_fats = read_field(device, BPB_NUM_FATS, 1, "number of FATs")?[0];
    let total_sectors =
        LittleEndian::read_u32(&read_field(device, BPB_TOT_SEC32, 4, "total sectors")?);
    let sectors_per_fat =
        LittleEndian::read_u32(&read_field(device, BPB_FAT_SZ32, 4, "sectors per FAT")?);
    let root_cluster =
        LittleEndian::read_u32(&read_field(device, BPB_ROOT_CLUS, 4, "root cluster")?);

    let geometry = VolumeGeometry::from_fields(
        bytes_per_sector,
        sectors_per_cluster,
        reserved_sector_count,
        num_fats,
        sectors_per_fat,
        total_sectors,
        root_cluster,
    )?;

    if !geometry.is_valid_cluster(geometry.root_cluster) {
        return Err(ParseError::InvalidRootCluster(geometry.root_cluster));
    }

    info!("FAT32 volume geometry:");
    info!("  Bytes per sector: {}", geometry.bytes_per_sector);
    info!("  Sectors per cluster: {}", geometry.sectors_per_cluster);
    info!("  FAT start: sector {}", geometry.reserved_sector_count);
    info!("  Data start: sector {}", geometry.data_region_start_sector);
    info!("  Root cluster: {}", geometry.root_cluster);
    info!("  Total clusters: {}", geometry.total_cluster_count);

    Ok(geometry)
}

/// Descriptive volume information for display.
#[derive(Debug, Clone)]
pub struct VolumeInfo {
    pub root_cluster: u32,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub total_clusters: u32,
    pub entries_per_fat: u64,
    pub sectors_per_fat: u32,
    pub image_size: u64,
    pub label: Option<String>,
    pub fs_type: Option<String>,
    pub has_boot_signature: bool,
}

fn read_text<D: BlockDevice + ?Sized>(device: &D, offset: u64, length: u32) -> Option<String> {
    let bytes = device.read_exact_at(offset, length).ok()?;
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    if text.is_empty() || text == "NO NAME" {
        None
    } else {
        Some(text)
    }
}

impl VolumeInfo {
    /// Gather info; the label, type string and signature are best effort.
    pub fn read<D: BlockDevice + ?Sized>(device: &D, geometry: &VolumeGeometry) -> Self {
        let has_boot_signature = device
            .read_exact_at(BOOT_SIGNATURE_OFFSET, 2)
            .map(|sig| sig == BOOT_SIGNATURE)
            .unwrap_or(false);

        if !has_boot_signature {
            warn!("Boot sector lacks the 0x55AA signature");
        }

        Self {
            root_cluster: geometry.root_cluster,
            bytes_per_sector: geometry.bytes_per_sector,
            sectors_per_cluster: geometry.sectors_per_cluster,
            total_clusters: geometry.total_cluster_count,
            entries_per_fat: geometry.entries_per_fat,
            sectors_per_fat: geometry.sectors_per_fat,
            image_size: device.size(),
            label: read_text(device, BS32_VOL_LAB, 11),
            fs_type: read_text(device, BS32_FIL_SYS_TYPE, 8),
            has_boot_signature,
        }
    }
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Root Cluster: {}", self.root_cluster)?;
        writeln!(f, "Bytes Per Sector: {}", self.bytes_per_sector)?;
        writeln!(f, "Sectors Per Cluster: {}", self.sectors_per_cluster)?;
        writeln!(f, "Total Clusters in Data Region: {}", self.total_clusters)?;
        writeln!(f, "Entries Per FAT: {}", self.entries_per_fat)?;
        writeln!(f, "Sectors Per FAT: {}", self.sectors_per_fat)?;
        writeln!(f, "Image Size: {} bytes", self.image_size)?;
        if let Some(label) = &self.label {
            writeln!(f, "Volume Label: {}", label)?;
        }
        if let Some(fs_type) = &self.fs_type {
            writeln!(f, "Filesystem Type: {}", fs_type)?;
        }
        write!(f, "Boot Signature: {}", if self.has_boot_signature { "present" } else { "missing" })
    }
}
