// FAT32 navigator facade
// Owns the device, the parsed geometry and the session state

use super::boot_sector::{parse, VolumeGeometry, VolumeInfo};
use super::directory::{list_entries, DirectoryEntry};
use super::file_ops::{read_file_range, OpenFile, OpenFileTable, OpenMode};
use super::path_resolver::{DirectoryPosition, Fat32PathResolver, ResolvedPath};
use fatnav_core::{BlockDevice, FileError, NavResult, NavigatorConfig};
use log::{debug, info};

/// Session state: working directory with its ancestry, and the open-file table.
#[derive(Debug, Clone)]
pub struct NavigatorState {
    pub cwd: DirectoryPosition,
    pub open_files: OpenFileTable,
}

impl NavigatorState {
    pub fn new(root_cluster: u32, max_open_files: usize) -> Self {
        Self {
            cwd: DirectoryPosition::root(root_cluster),
            open_files: OpenFileTable::new(max_open_files),
        }
    }
}

/// Read-only navigator over a mounted FAT32 image.
///
/// Every operation either succeeds or leaves [`NavigatorState`] exactly as it was.
pub struct Fat32Navigator<D: BlockDevice> {
    device: D,
    geometry: VolumeGeometry,
    config: NavigatorConfig,
    chain_limit: u32,
    state: NavigatorState,
}

impl<D: BlockDevice> Fat32Navigator<D> {
    /// Mount with default limits.
    pub fn new(device: D) -> NavResult<Self> {
        Self::mount(device, NavigatorConfig::default())
    }

    /// Parse the boot sector and start a session at the root directory.
    pub fn mount(device: D, config: NavigatorConfig) -> NavResult<Self> {
        config.validate()?;
        let geometry = parse(&device)?;
        let chain_limit = config.chain_step_limit(geometry.total_cluster_count);

        info!(
            "Mounted FAT32 volume: root cluster {}, {} clusters, chain step limit {}",
            geometry.root_cluster, geometry.total_cluster_count, chain_limit
        );

        let state = NavigatorState::new(geometry.root_cluster, config.max_open_files);
        Ok(Self {
            device,
            geometry,
            config,
            chain_limit,
            state,
        })
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn state(&self) -> &NavigatorState {
        &self.state
    }

    pub fn info(&self) -> VolumeInfo {
        VolumeInfo::read(&self.device, &self.geometry)
    }

    pub fn current_cluster(&self) -> u32 {
        self.state.cwd.cluster
    }

    /// Working directory path, `/` at the root.
    pub fn cwd(&self) -> String {
        self.state.cwd.path_string()
    }

    fn resolver(&self) -> Fat32PathResolver<'_, D> {
        Fat32PathResolver::new(
            &self.device,
            &self.geometry,
            self.chain_limit,
            self.config.max_depth,
        )
    }

    pub fn list_directory(&self, cluster: u32) -> NavResult<Vec<DirectoryEntry>> {
        Ok(list_entries(&self.device, &self.geometry, cluster, self.chain_limit)?)
    }

    pub fn list_current(&self) -> NavResult<Vec<DirectoryEntry>> {
        self.list_directory(self.state.cwd.cluster)
    }

    /// List the directory `path` names, relative to the working directory.
    pub fn list_path(&self, path: &str) -> NavResult<Vec<DirectoryEntry>> {
        let position = self.resolver().resolve_directory(&self.state.cwd, path)?;
        self.list_directory(position.cluster)
    }

    pub fn resolve(&self, path: &str) -> NavResult<ResolvedPath> {
        Ok(self.resolver().resolve(&self.state.cwd, path)?)
    }

    /// Change the working directory. `..` at the root stays at the root.
    pub fn change_directory(&mut self, path: &str) -> NavResult<()> {
        let position = self.resolver().resolve_directory(&self.state.cwd, path)?;
        debug!("cd {} -> cluster {} ({})", path, position.cluster, position.path_string());
        self.state.cwd = position;
        Ok(())
    }

    /// Open a file of the working directory. `mode` is one of `-r`, `-w`, `-rw`, `-wr`.
    pub fn open_file(&mut self, name: &str, mode: &str) -> NavResult<&OpenFile> {
        let mode: OpenMode = mode.parse()?;
        let dir_cluster = self.state.cwd.cluster;
        Ok(self.state.open_files.open(
            &self.device,
            &self.geometry,
            self.chain_limit,
            dir_cluster,
            name,
            mode,
        )?)
    }

    pub fn seek(&mut self, name: &str, offset: i64) -> NavResult<()> {
        Ok(self.state.open_files.seek(name, offset)?)
    }

    pub fn read(&mut self, name: &str, size: usize) -> NavResult<Vec<u8>> {
        Ok(self
            .state
            .open_files
            .read(&self.device, &self.geometry, self.chain_limit, name, size)?)
    }

    pub fn close(&mut self, name: &str) -> NavResult<OpenFile> {
        Ok(self.state.open_files.close(name)?)
    }

    /// Open files in the order they were opened.
    pub fn open_files(&self) -> Vec<OpenFile> {
        self.state.open_files.iter().cloned().collect()
    }

    /// Whole contents of the file `path` names, independent of the open-file table.
    pub fn read_file(&self, path: &str) -> NavResult<Vec<u8>> {
        let resolved = self.resolve(path)?;
        let entry = match resolved.entry {
            Some(entry) if !entry.is_directory() => entry,
            _ => return Err(FileError::IsADirectory(path.to_string()).into()),
        };

        Ok(read_file_range(
            &self.device,
            &self.geometry,
            self.chain_limit,
            entry.first_cluster,
            entry.file_size,
            0,
            entry.file_size as u64,
        )?)
    }

    pub fn into_device(self) -> D {
        self.device
    }
}
