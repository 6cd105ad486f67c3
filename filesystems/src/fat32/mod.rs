// FAT32 module - boot sector, FAT, directories, paths and file access

pub mod constants;
pub mod boot_sector;
pub mod cluster_calc;
pub mod fat_table;
pub mod directory;
pub mod path_resolver;
pub mod file_ops;
pub mod navigator;

pub use boot_sector::{parse, VolumeGeometry, VolumeInfo};
pub use directory::{DirectoryEntry, DirectoryReader, EntryOutcome};
pub use fat_table::{next_cluster, ClusterChain, NextCluster};
pub use file_ops::{OpenFile, OpenFileTable, OpenMode};
pub use navigator::{Fat32Navigator, NavigatorState};
pub use path_resolver::{DirectoryPosition, Fat32PathResolver, ResolvedPath};
