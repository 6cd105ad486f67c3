// FAT32 Path Resolution Module
// Walks slash-separated paths from the root or a working directory

use super::boot_sector::VolumeGeometry;
use super::directory::{find_entry, format_short_name, DirectoryEntry};
use fatnav_core::{BlockDevice, PathError};
use log::debug;

/// A directory plus the ancestor clusters used to walk back out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPosition {
    pub cluster: u32,
    /// Clusters of the enclosing directories, innermost last.
    pub ancestors: Vec<u32>,
    /// Display names of the path components from the root.
    pub components: Vec<String>,
}

impl DirectoryPosition {
    pub fn root(root_cluster: u32) -> Self {
        Self {
            cluster: root_cluster,
            ancestors: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Absolute path string, `/` at the root.
    pub fn path_string(&self) -> String {
        format!("/{}", self.components.join("/"))
    }

    fn descend(&mut self, cluster: u32, name: String, max_depth: usize) -> Result<(), PathError> {
        if self.ancestors.len() >= max_depth {
            return Err(PathError::TooDeep { limit: max_depth });
        }
        self.ancestors.push(self.cluster);
        self.cluster = cluster;
        self.components.push(name);
        Ok(())
    }

    /// `..`: pop an ancestor, or land on the root when none is left.
    fn ascend(&mut self, root_cluster: u32) {
        match self.ancestors.pop() {
            Some(parent) => {
                self.cluster = parent;
                self.components.pop();
            }
            None => {
                self.cluster = root_cluster;
                self.components.clear();
            }
        }
    }
}

/// Represents a resolved path
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    /// Directory reached by the path. For a file, the directory holding it.
    pub directory: DirectoryPosition,
    /// Entry named by the last segment; `None` for the root, `.` and `..`.
    pub entry: Option<DirectoryEntry>,
}

impl ResolvedPath {
    pub fn is_directory(&self) -> bool {
        self.entry.as_ref().map_or(true, |e| e.is_directory())
    }

    /// First cluster of whatever the path names.
    pub fn cluster(&self) -> u32 {
        match &self.entry {
            Some(entry) if !entry.is_directory() => entry.first_cluster,
            _ => self.directory.cluster,
        }
    }
}

/// FAT32 path resolver
pub struct Fat32PathResolver<'a, D: BlockDevice + ?Sized> {
    device: &'a D,
    geometry: &'a VolumeGeometry,
    chain_limit: u32,
    max_depth: usize,
}

impl<'a, D: BlockDevice + ?Sized> Fat32PathResolver<'a, D> {
    pub fn new(
        device: &'a D,
        geometry: &'a VolumeGeometry,
        chain_limit: u32,
        max_depth: usize,
    ) -> Self {
        Self {
            device,
            geometry,
            chain_limit,
            max_depth,
        }
    }

    /// Resolve `path` from `start`; the last segment may name a file.
    pub fn resolve(
        &self,
        start: &DirectoryPosition,
        path: &str,
    ) -> Result<ResolvedPath, PathError> {
        self.walk(start, path, false)
    }

    /// Resolve `path` from `start`; every segment must name a directory.
    pub fn resolve_directory(
        &self,
        start: &DirectoryPosition,
        path: &str,
    ) -> Result<DirectoryPosition, PathError> {
        Ok(self.walk(start, path, true)?.directory)
    }

    /// Resolve from a bare cluster with no ancestry to its target cluster.
    pub fn resolve_cluster(&self, start_cluster: u32, path: &str) -> Result<u32, PathError> {
        let start = DirectoryPosition::root(start_cluster);
        Ok(self.resolve(&start, path)?.cluster())
    }

    fn walk(
        &self,
        start: &DirectoryPosition,
        path: &str,
        directories_only: bool,
    ) -> Result<ResolvedPath, PathError> {
        let root = self.geometry.root_cluster;
        let path = Self::normalize_path(path);

        let mut position = if path.starts_with('/') {
            DirectoryPosition::root(root)
        } else {
            start.clone()
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut entry = None;

        for (idx, segment) in segments.iter().enumerate() {
            let last = idx + 1 == segments.len();

            match *segment {
                "." => entry = None,
                ".." => {
                    position.ascend(root);
                    entry = None;
                }
                name => {
                    let short_name = format_short_name(name);
                    let need_directory = directories_only || !last;

                    let found = find_entry(
                        self.device,
                        self.geometry,
                        position.cluster,
                        self.chain_limit,
                        &short_name,
                        |e| !need_directory || e.is_directory(),
                    )?
                    .ok_or_else(|| PathError::NotFound(name.to_string()))?;

                    if found.is_directory() {
                        // First cluster 0 in a directory entry refers to the root
                        let target = if found.first_cluster == 0 {
                            root
                        } else {
                            found.first_cluster
                        };
                        debug!("Entering '{}' at cluster {}", found.display_name(), target);
                        position.descend(target, found.display_name(), self.max_depth)?;
                    }
                    entry = Some(found);
                }
            }
        }

        Ok(ResolvedPath {
            directory: position,
            entry,
        })
    }

    /// Normalize path (backslashes to slashes, collapse repeats, drop trailing slash)
    pub fn normalize_path(path: &str) -> String {
        let path = path.trim().replace('\\', "/");

        let mut normalized = String::with_capacity(path.len());
        let mut prev_slash = false;
        for ch in path.chars() {
            if ch == '/' {
                if !prev_slash {
                    normalized.push(ch);
                }
                prev_slash = true;
            } else {
                normalized.push(ch);
                prev_slash = false;
            }
        }

        if normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }

        normalized
    }
}
