// FAT32 directory entry decoding and directory scanning
// Entries are decoded field by field from 32-byte records, never by struct overlay

use super::boot_sector::VolumeGeometry;
use super::cluster_calc::cluster_sector_offset;
use super::constants::*;
use super::fat_table::ClusterChain;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};
use fatnav_core::{BlockDevice, ChainError};
use log::trace;

/// A decoded 32-byte short directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Raw 8.3 name, space padded.
    pub name: [u8; SHORT_NAME_TOTAL],
    pub attributes: u8,
    pub first_cluster: u32,
    pub file_size: u32,
    pub modified: Option<NaiveDateTime>,
}

impl DirectoryEntry {
    pub fn from_bytes(raw: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut name = [0u8; SHORT_NAME_TOTAL];
        name.copy_from_slice(&raw[DIR_NAME..DIR_NAME + SHORT_NAME_TOTAL]);

        let hi = LittleEndian::read_u16(&raw[DIR_FST_CLUS_HI..]) as u32;
        let lo = LittleEndian::read_u16(&raw[DIR_FST_CLUS_LO..]) as u32;

        Self {
            name,
            attributes: raw[DIR_ATTR],
            first_cluster: (hi << 16) | lo,
            file_size: LittleEndian::read_u32(&raw[DIR_FILE_SIZE..]),
            modified: parse_datetime(
                LittleEndian::read_u16(&raw[DIR_WRT_DATE..]),
                LittleEndian::read_u16(&raw[DIR_WRT_TIME..]),
            ),
        }
    }

    /// `NAME.EXT`, or `NAME` when there is no extension.
    pub fn display_name(&self) -> String {
        let (name, ext) = split_name_ext(&self.name);
        if ext.is_empty() {
            name
        } else {
            format!("{}.{}", name, ext)
        }
    }

    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes & ATTR_VOLUME_ID != 0 && !self.is_directory()
    }

    pub fn is_hidden(&self) -> bool {
        self.attributes & ATTR_HIDDEN != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.attributes & ATTR_READ_ONLY != 0
    }

    /// `.` or `..`
    pub fn is_dot_entry(&self) -> bool {
        &self.name == b".          " || &self.name == b"..         "
    }

    /// Entries listing consumers skip: empty or non-printable leading name byte.
    pub fn is_noise(&self) -> bool {
        let first = self.name[0];
        first == b' ' || !(first.is_ascii_graphic())
    }

    /// Case-insensitive comparison against an 8.3-formatted name.
    pub fn matches(&self, short_name: &[u8; SHORT_NAME_TOTAL]) -> bool {
        self.name.eq_ignore_ascii_case(short_name)
    }
}

/// Split a raw 8.3 name into name and extension: the first run of
/// non-space characters in bytes 0-7 and in bytes 8-10.
pub fn split_name_ext(raw: &[u8; SHORT_NAME_TOTAL]) -> (String, String) {
    let run = |bytes: &[u8]| -> String {
        bytes.iter().take_while(|&&b| b != b' ').map(|&b| b as char).collect()
    };
    (run(&raw[..SHORT_NAME_LEN]), run(&raw[SHORT_NAME_LEN..]))
}

/// Format a user-supplied name as a space-padded, uppercase 8.3 name.
///
/// Over-long name and extension parts are truncated, matching how short
/// names are stored on disk.
pub fn format_short_name(input: &str) -> [u8; SHORT_NAME_TOTAL] {
    let mut formatted = [b' '; SHORT_NAME_TOTAL];

    if input == "." || input == ".." {
        formatted[..input.len()].copy_from_slice(input.as_bytes());
        return formatted;
    }

    let bytes = input.as_bytes();
    let (name, ext) = match bytes.iter().position(|&b| b == b'.') {
        Some(dot) => (&bytes[..dot], &bytes[dot + 1..]),
        None => (bytes, &[][..]),
    };

    for (slot, b) in formatted[..SHORT_NAME_LEN].iter_mut().zip(name) {
        *slot = b.to_ascii_uppercase();
    }
    for (slot, b) in formatted[SHORT_NAME_LEN..].iter_mut().zip(ext) {
        *slot = b.to_ascii_uppercase();
    }

    formatted
}

/// Display form of a user-supplied name after 8.3 normalization.
pub fn normalize_name(input: &str) -> String {
    let (name, ext) = split_name_ext(&format_short_name(input));
    if ext.is_empty() {
        name
    } else {
        format!("{}.{}", name, ext)
    }
}

fn parse_datetime(date: u16, time: u16) -> Option<NaiveDateTime> {
    if date == 0 {
        return None;
    }

    let year = 1980 + ((date >> 9) & 0x7F) as i32;
    let month = ((date >> 5) & 0x0F) as u32;
    let day = (date & 0x1F) as u32;

    let hour = ((time >> 11) & 0x1F) as u32;
    let minute = ((time >> 5) & 0x3F) as u32;
    let second = ((time & 0x1F) * 2) as u32;

    NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, minute, second))
}

/// Classification of one raw directory slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Valid(DirectoryEntry),
    Deleted,
    LongNameFragment,
    /// Name byte 0x00: nothing follows in this directory.
    EndOfDirectory,
}

pub fn classify(raw: &[u8; DIR_ENTRY_SIZE]) -> EntryOutcome {
    match raw[DIR_NAME] {
        DIR_ENTRY_END => EntryOutcome::EndOfDirectory,
        DIR_ENTRY_DELETED => EntryOutcome::Deleted,
        _ if raw[DIR_ATTR] & 0x3F == ATTR_LONG_NAME => EntryOutcome::LongNameFragment,
        _ => EntryOutcome::Valid(DirectoryEntry::from_bytes(raw)),
    }
}

/// Lazy scan over the entries of a directory's cluster chain.
///
/// Reads one sector at a time. The sequence ends after yielding
/// `EndOfDirectory`, at the end of the chain, or after the first error.
pub struct DirectoryReader<'a, D: BlockDevice + ?Sized> {
    device: &'a D,
    geometry: &'a VolumeGeometry,
    chain: ClusterChain<'a, D>,
    cluster: Option<u32>,
    sector_index: u8,
    sector: Vec<u8>,
    slot: usize,
    finished: bool,
}

impl<'a, D: BlockDevice + ?Sized> DirectoryReader<'a, D> {
    pub fn new(
        device: &'a D,
        geometry: &'a VolumeGeometry,
        start_cluster: u32,
        chain_limit: u32,
    ) -> Self {
        Self {
            device,
            geometry,
            chain: ClusterChain::new(device, geometry, start_cluster, chain_limit),
            cluster: None,
            sector_index: 0,
            sector: Vec::new(),
            slot: 0,
            finished: false,
        }
    }

    fn finish(&mut self, error: ChainError) -> Option<Result<EntryOutcome, ChainError>> {
        self.finished = true;
        Some(Err(error))
    }
}

impl<'a, D: BlockDevice + ?Sized> Iterator for DirectoryReader<'a, D> {
    type Item = Result<EntryOutcome, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if (self.slot + 1) * DIR_ENTRY_SIZE <= self.sector.len() {
                let start = self.slot * DIR_ENTRY_SIZE;
                let mut raw = [0u8; DIR_ENTRY_SIZE];
                raw.copy_from_slice(&self.sector[start..start + DIR_ENTRY_SIZE]);
                self.slot += 1;

                let outcome = classify(&raw);
                trace!("Directory slot {}: {:?}", self.slot - 1, outcome);
                if outcome == EntryOutcome::EndOfDirectory {
                    self.finished = true;
                }
                return Some(Ok(outcome));
            }

            match self.cluster {
                Some(cluster) if self.sector_index < self.geometry.sectors_per_cluster => {
                    let offset = cluster_sector_offset(self.geometry, cluster, self.sector_index);
                    match self.device.read_exact_at(offset, self.geometry.bytes_per_sector as u32) {
                        Ok(bytes) => self.sector = bytes,
                        Err(e) => return self.finish(ChainError::Device(e)),
                    }
                    self.sector_index += 1;
                    self.slot = 0;
                }
                _ => match self.chain.next() {
                    None => {
                        self.finished = true;
                        return None;
                    }
                    Some(Err(e)) => return self.finish(e),
                    Some(Ok(cluster)) => {
                        self.cluster = Some(cluster);
                        self.sector_index = 0;
                        self.sector.clear();
                        self.slot = 0;
                    }
                },
            }
        }
    }
}

/// Valid entries of a directory with the listing policy applied:
/// deleted slots, long-name fragments, volume labels and noise are skipped.
pub fn list_entries<D: BlockDevice + ?Sized>(
    device: &D,
    geometry: &VolumeGeometry,
    cluster: u32,
    chain_limit: u32,
) -> Result<Vec<DirectoryEntry>, ChainError> {
    let mut entries = Vec::new();
    for outcome in DirectoryReader::new(device, geometry, cluster, chain_limit) {
        if let EntryOutcome::Valid(entry) = outcome? {
            if !entry.is_volume_label() && !entry.is_noise() {
                entries.push(entry);
            }
        }
    }
    Ok(entries)
}

/// First valid, non-label entry named `short_name` that satisfies `accept`.
pub fn find_entry<D, F>(
    device: &D,
    geometry: &VolumeGeometry,
    cluster: u32,
    chain_limit: u32,
    short_name: &[u8; SHORT_NAME_TOTAL],
    accept: F,
) -> Result<Option<DirectoryEntry>, ChainError>
where
    D: BlockDevice + ?Sized,
    F: Fn(&DirectoryEntry) -> bool,
{
    for outcome in DirectoryReader::new(device, geometry, cluster, chain_limit) {
        if let EntryOutcome::Valid(entry) = outcome? {
            if !entry.is_volume_label() && entry.matches(short_name) && accept(&entry) {
                return Ok(Some(entry));
            }
        }
    }
    Ok(None)
}
