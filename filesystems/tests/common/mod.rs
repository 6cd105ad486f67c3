// Synthetic FAT32 images written to temporary files

use std::io::Write;
use tempfile::NamedTempFile;

pub const EOC: u32 = 0x0FFF_FFFF;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_VOLUME_ID: u8 = 0x08;

const BYTES_PER_SECTOR: usize = 512;
const RESERVED_SECTORS: usize = 32;
const SECTORS_PER_FAT: usize = 8;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn entry(name: &[u8; 11], attributes: u8, first_cluster: u32, size: u32) -> [u8; 32] {
    let mut raw = [0u8; 32];
    raw[0..11].copy_from_slice(name);
    raw[11] = attributes;
    raw[20..22].copy_from_slice(&((first_cluster >> 16) as u16).to_le_bytes());
    raw[26..28].copy_from_slice(&(first_cluster as u16).to_le_bytes());
    raw[28..32].copy_from_slice(&size.to_le_bytes());
    raw
}

/// One sector per cluster, a single FAT, 128 data clusters.
pub struct SyntheticImage {
    bytes: Vec<u8>,
}

impl SyntheticImage {
    pub fn new(label: &str) -> Self {
        let total_sectors = RESERVED_SECTORS + SECTORS_PER_FAT + 128;
        let mut bytes = vec![0u8; total_sectors * BYTES_PER_SECTOR];

        bytes[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        bytes[3..11].copy_from_slice(b"MSWIN4.1");
        bytes[11..13].copy_from_slice(&(BYTES_PER_SECTOR as u16).to_le_bytes());
        bytes[13] = 1;
        bytes[14..16].copy_from_slice(&(RESERVED_SECTORS as u16).to_le_bytes());
        bytes[16] = 1;
        bytes[32..36].copy_from_slice(&(total_sectors as u32).to_le_bytes());
        bytes[36..40].copy_from_slice(&(SECTORS_PER_FAT as u32).to_le_bytes());
        bytes[44..48].copy_from_slice(&2u32.to_le_bytes());
        let mut padded = [b' '; 11];
        padded[..label.len()].copy_from_slice(label.as_bytes());
        bytes[71..82].copy_from_slice(&padded);
        bytes[82..90].copy_from_slice(b"FAT32   ");
        bytes[510] = 0x55;
        bytes[511] = 0xAA;

        let mut image = Self { bytes };
        image.fat(0, 0x0FFF_FFF8);
        image.fat(1, EOC);
        image.fat(2, EOC);
        image
    }

    pub fn fat(&mut self, cluster: u32, value: u32) -> &mut Self {
        let offset = RESERVED_SECTORS * BYTES_PER_SECTOR + cluster as usize * 4;
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn chain(&mut self, clusters: &[u32]) -> &mut Self {
        for pair in clusters.windows(2) {
            self.fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.fat(last, EOC);
        }
        self
    }

    fn cluster_offset(cluster: u32) -> usize {
        (RESERVED_SECTORS + SECTORS_PER_FAT + cluster as usize - 2) * BYTES_PER_SECTOR
    }

    pub fn write(&mut self, cluster: u32, within: usize, data: &[u8]) -> &mut Self {
        let offset = Self::cluster_offset(cluster) + within;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self
    }

    pub fn entries(&mut self, cluster: u32, entries: &[[u8; 32]]) -> &mut Self {
        for (i, raw) in entries.iter().enumerate() {
            self.write(cluster, i * 32, raw);
        }
        self
    }

    pub fn truncate(&mut self, len: usize) -> &mut Self {
        self.bytes.truncate(len);
        self
    }

    pub fn to_tempfile(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.bytes).unwrap();
        file.flush().unwrap();
        file
    }
}

/// A small tree:
///
/// ```text
/// /            cluster 2   label "TESTVOL", FOO.TXT, GAMES/, a deleted and an LFN slot
/// /FOO.TXT     cluster 3   "hello" (size 5, cluster holds more)
/// /GAMES       cluster 4   ., .., SAVE.DAT, LEVELS/
/// /GAMES/SAVE.DAT          clusters 10 -> 20 -> 11, 1200 bytes
/// /GAMES/LEVELS            cluster 5   empty
/// ```
pub fn sample_tree() -> SyntheticImage {
    let mut image = SyntheticImage::new("TESTVOL");

    let mut deleted = entry(b"OLD     TXT", ATTR_ARCHIVE, 7, 10);
    deleted[0] = 0xE5;
    let mut lfn = [0xFFu8; 32];
    lfn[0] = 0x41;
    lfn[11] = 0x0F;

    image
        .chain(&[3])
        .chain(&[4])
        .chain(&[5])
        .chain(&[10, 20, 11])
        .entries(2, &[
            entry(b"TESTVOL    ", ATTR_VOLUME_ID, 0, 0),
            deleted,
            lfn,
            entry(b"FOO     TXT", ATTR_ARCHIVE, 3, 5),
            entry(b"GAMES      ", ATTR_DIRECTORY, 4, 0),
        ])
        .entries(4, &[
            entry(b".          ", ATTR_DIRECTORY, 4, 0),
            entry(b"..         ", ATTR_DIRECTORY, 0, 0),
            entry(b"SAVE    DAT", ATTR_ARCHIVE, 10, 1200),
            entry(b"LEVELS     ", ATTR_DIRECTORY, 5, 0),
        ])
        .entries(5, &[
            entry(b".          ", ATTR_DIRECTORY, 5, 0),
            entry(b"..         ", ATTR_DIRECTORY, 4, 0),
        ])
        .write(3, 0, b"hello, trailing garbage");

    image.write(10, 0, &[b'a'; 512]);
    image.write(20, 0, &[b'b'; 512]);
    image.write(11, 0, &[b'c'; 512]);
    image
}
