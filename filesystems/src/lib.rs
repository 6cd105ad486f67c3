// Read-only FAT32 navigation over a block device image
pub mod fat32;

#[cfg(test)]
pub mod test_helpers;

pub use fat32::{
    DirectoryEntry, EntryOutcome, Fat32Navigator, NavigatorState, OpenFile, OpenMode,
    VolumeGeometry, VolumeInfo,
};
