// FAT32 on-disk constants
// Boot sector field offsets, entry layout and cluster markers

// BIOS Parameter Block offsets
pub const BPB_BYTES_PER_SEC: u64 = 0x0B;
pub const BPB_SEC_PER_CLUS: u64 = 0x0D;
pub const BPB_RSVD_SEC_CNT: u64 = 0x0E;
pub const BPB_NUM_FATS: u64 = 0x10;
pub const BPB_TOT_SEC32: u64 = 0x20;
pub const BPB_FAT_SZ32: u64 = 0x24;
pub const BPB_ROOT_CLUS: u64 = 0x2C;
pub const BS32_VOL_LAB: u64 = 0x47;
pub const BS32_FIL_SYS_TYPE: u64 = 0x52;

// Boot sector signature
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const BOOT_SIGNATURE_OFFSET: u64 = 0x1FE;

// FAT entry values (28 significant bits)
pub const FAT32_ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const FAT32_EOC_MIN: u32 = 0x0FFF_FFF8;
pub const FAT32_FREE: u32 = 0x0000_0000;
pub const FAT32_ENTRY_SIZE: u64 = 4;
pub const FIRST_DATA_CLUSTER: u32 = 2;
/// Highest cluster number FAT32 can address; above it are bad and end markers.
pub const FAT32_MAX_CLUSTER: u32 = 0x0FFF_FFF6;

// Directory entries
pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_ENTRY_END: u8 = 0x00;
pub const DIR_ENTRY_DELETED: u8 = 0xE5;

// Directory entry field offsets
pub const DIR_NAME: usize = 0;
pub const DIR_ATTR: usize = 11;
pub const DIR_FST_CLUS_HI: usize = 20;
pub const DIR_WRT_TIME: usize = 22;
pub const DIR_WRT_DATE: usize = 24;
pub const DIR_FST_CLUS_LO: usize = 26;
pub const DIR_FILE_SIZE: usize = 28;

// Directory entry attributes
pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

// 8.3 name widths
pub const SHORT_NAME_LEN: usize = 8;
pub const SHORT_EXT_LEN: usize = 3;
pub const SHORT_NAME_TOTAL: usize = SHORT_NAME_LEN + SHORT_EXT_LEN;
