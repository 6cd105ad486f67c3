// FAT32 File Operations Module
// Open-file table with per-file cursors and offset-based reads

use super::boot_sector::VolumeGeometry;
use super::cluster_calc::cluster_to_data_offset;
use super::directory::{find_entry, format_short_name, normalize_name};
use super::fat_table::read_cluster_chain;
use fatnav_core::{BlockDevice, FileError};
use log::{debug, warn};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    pub fn can_read(&self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }
}

impl FromStr for OpenMode {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-r" => Ok(OpenMode::Read),
            "-w" => Ok(OpenMode::Write),
            "-rw" | "-wr" => Ok(OpenMode::ReadWrite),
            other => Err(FileError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpenMode::Read => "-r",
            OpenMode::Write => "-w",
            OpenMode::ReadWrite => "-rw",
        })
    }
}

/// An entry of the open-file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    /// 8.3-normalized name, the table key.
    pub name: String,
    pub mode: OpenMode,
    pub first_cluster: u32,
    /// Size recorded in the directory entry.
    pub size: u32,
    pub offset: u64,
}

/// Read up to `length` bytes at `offset` from the file starting at `first_cluster`.
///
/// The chain is walked in full on every call; the readable length is the
/// smaller of the recorded size and the chain's byte length. Runs of
/// consecutive clusters are fetched with a single device read.
pub fn read_file_range<D: BlockDevice + ?Sized>(
    device: &D,
    geometry: &VolumeGeometry,
    chain_limit: u32,
    first_cluster: u32,
    size: u32,
    offset: u64,
    length: u64,
) -> Result<Vec<u8>, FileError> {
    let clusters = read_cluster_chain(device, geometry, first_cluster, chain_limit)?;
    let bytes_per_cluster = geometry.bytes_per_cluster();
    let chain_bytes = clusters.len() as u64 * bytes_per_cluster;

    if size as u64 > chain_bytes {
        warn!(
            "File at cluster {} records {} bytes but its chain holds only {}",
            first_cluster, size, chain_bytes
        );
    }

    let readable = (size as u64).min(chain_bytes);
    if offset >= readable || length == 0 {
        return Ok(Vec::new());
    }
    let end = offset + length.min(readable - offset);

    let mut data = Vec::with_capacity((end - offset) as usize);
    let mut pos = offset;
    while pos < end {
        let first = (pos / bytes_per_cluster) as usize;
        let mut last = first;
        while last + 1 < clusters.len()
            && clusters[last + 1] == clusters[last] + 1
            && (last as u64 + 1) * bytes_per_cluster < end
        {
            last += 1;
        }

        let run_end = end.min((last as u64 + 1) * bytes_per_cluster);
        let device_offset =
            cluster_to_data_offset(geometry, clusters[first]) + pos % bytes_per_cluster;
        data.extend_from_slice(&device.read_exact_at(device_offset, (run_end - pos) as u32)?);
        pos = run_end;
    }

    Ok(data)
}

/// Open-file table. Entries keep insertion order; closing compacts.
#[derive(Debug, Clone)]
pub struct OpenFileTable {
    files: Vec<OpenFile>,
    capacity: usize,
}

impl OpenFileTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            files: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenFile> {
        self.files.iter()
    }

    pub fn get(&self, name: &str) -> Option<&OpenFile> {
        let key = normalize_name(name);
        self.files.iter().find(|f| f.name == key)
    }

    fn index_of(&self, name: &str) -> Result<usize, FileError> {
        let key = normalize_name(name);
        self.files
            .iter()
            .position(|f| f.name == key)
            .ok_or(FileError::NotOpen(key))
    }

    /// Open the non-directory entry `name` of the directory at `dir_cluster`.
    pub fn open<D: BlockDevice + ?Sized>(
        &mut self,
        device: &D,
        geometry: &VolumeGeometry,
        chain_limit: u32,
        dir_cluster: u32,
        name: &str,
        mode: OpenMode,
    ) -> Result<&OpenFile, FileError> {
        let key = normalize_name(name);
        if self.files.iter().any(|f| f.name == key) {
            return Err(FileError::AlreadyOpen(key));
        }
        if self.files.len() >= self.capacity {
            return Err(FileError::TooManyOpenFiles { limit: self.capacity });
        }

        let entry = find_entry(
            device,
            geometry,
            dir_cluster,
            chain_limit,
            &format_short_name(name),
            |e| !e.is_directory(),
        )?
        .ok_or_else(|| FileError::NotFound(name.to_string()))?;

        debug!(
            "Opened {} ({}) at cluster {}, {} bytes",
            key, mode, entry.first_cluster, entry.file_size
        );
        self.files.push(OpenFile {
            name: key,
            mode,
            first_cluster: entry.first_cluster,
            size: entry.file_size,
            offset: 0,
        });

        let idx = self.files.len() - 1;
        Ok(&self.files[idx])
    }

    /// Move the cursor. Offsets past the end are accepted; reads clamp.
    pub fn seek(&mut self, name: &str, offset: i64) -> Result<(), FileError> {
        let idx = self.index_of(name)?;
        if offset < 0 {
            return Err(FileError::InvalidOffset(offset));
        }
        self.files[idx].offset = offset as u64;
        Ok(())
    }

    /// Read up to `size` bytes at the cursor and advance it by the bytes returned.
    pub fn read<D: BlockDevice + ?Sized>(
        &mut self,
        device: &D,
        geometry: &VolumeGeometry,
        chain_limit: u32,
        name: &str,
        size: usize,
    ) -> Result<Vec<u8>, FileError> {
        let idx = self.index_of(name)?;
        let file = &self.files[idx];
        if !file.mode.can_read() {
            return Err(FileError::NotReadable(file.name.clone()));
        }
        if size == 0 {
            return Ok(Vec::new());
        }

        let data = read_file_range(
            device,
            geometry,
            chain_limit,
            file.first_cluster,
            file.size,
            file.offset,
            size as u64,
        )?;

        self.files[idx].offset += data.len() as u64;
        Ok(data)
    }

    pub fn close(&mut self, name: &str) -> Result<OpenFile, FileError> {
        let idx = self.index_of(name)?;
        let file = self.files.remove(idx);
        debug!("Closed {}", file.name);
        Ok(file)
    }
}
