// FAT32 table lookups and bounded cluster chain walking
// next_cluster never loops; ClusterChain owns the step bound

use super::boot_sector::VolumeGeometry;
use super::cluster_calc::cluster_to_fat_entry_offset;
use super::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use fatnav_core::{BlockDevice, ChainError, DeviceError};
use log::debug;

/// Classification of a single FAT entry lookup.
#[derive(Debug)]
pub enum NextCluster {
    /// The chain continues at this cluster.
    Next(u32),
    EndOfChain,
    /// The entry is zero: a free cluster. Mid-chain this means corruption.
    FreeClusterEncountered,
    /// The queried cluster is outside the data region.
    Invalid,
    IoError(DeviceError),
}

/// Read the raw 32-bit FAT entry for `cluster` from the first FAT, masked to 28 bits.
pub fn read_fat_entry<D: BlockDevice + ?Sized>(
    device: &D,
    geometry: &VolumeGeometry,
    cluster: u32,
) -> Result<u32, DeviceError> {
    let offset = cluster_to_fat_entry_offset(geometry, cluster);
    let bytes = device.read_exact_at(offset, FAT32_ENTRY_SIZE as u32)?;
    Ok(LittleEndian::read_u32(&bytes) & FAT32_ENTRY_MASK)
}

/// Look up the successor of `cluster`.
pub fn next_cluster<D: BlockDevice + ?Sized>(
    device: &D,
    geometry: &VolumeGeometry,
    cluster: u32,
) -> NextCluster {
    if !geometry.is_valid_cluster(cluster) {
        return NextCluster::Invalid;
    }

    match read_fat_entry(device, geometry, cluster) {
        Ok(value) if value >= FAT32_EOC_MIN => NextCluster::EndOfChain,
        Ok(FAT32_FREE) => NextCluster::FreeClusterEncountered,
        Ok(value) => NextCluster::Next(value),
        Err(e) => NextCluster::IoError(e),
    }
}

enum ChainState {
    Start(u32),
    After(u32),
    Done,
}

/// Iterator over the clusters of a chain, bounded to `limit` clusters.
///
/// A start cluster of 0 is an empty chain (zero-length file). Any corruption
/// (free or out-of-range link, too many steps) is yielded once as an error and
/// ends the iteration.
pub struct ClusterChain<'a, D: BlockDevice + ?Sized> {
    device: &'a D,
    geometry: &'a VolumeGeometry,
    start: u32,
    limit: u32,
    steps: u32,
    state: ChainState,
}

impl<'a, D: BlockDevice + ?Sized> ClusterChain<'a, D> {
    pub fn new(device: &'a D, geometry: &'a VolumeGeometry, start: u32, limit: u32) -> Self {
        Self {
            device,
            geometry,
            start,
            limit,
            steps: 0,
            state: ChainState::Start(start),
        }
    }

    fn fail(&mut self, error: ChainError) -> Option<Result<u32, ChainError>> {
        self.state = ChainState::Done;
        Some(Err(error))
    }
}

impl<'a, D: BlockDevice + ?Sized> Iterator for ClusterChain<'a, D> {
    type Item = Result<u32, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            ChainState::Done => None,
            ChainState::Start(0) => {
                self.state = ChainState::Done;
                None
            }
            ChainState::Start(cluster) => {
                if !self.geometry.is_valid_cluster(cluster) {
                    return self.fail(ChainError::InvalidStart(cluster));
                }
                self.steps = 1;
                self.state = ChainState::After(cluster);
                Some(Ok(cluster))
            }
            ChainState::After(cluster) => match next_cluster(self.device, self.geometry, cluster) {
                NextCluster::EndOfChain => {
                    debug!("Chain from cluster {} ends after {} clusters", self.start, self.steps);
                    self.state = ChainState::Done;
                    None
                }
                NextCluster::Next(next) if !self.geometry.is_valid_cluster(next) => {
                    self.fail(ChainError::InvalidLink { cluster, next })
                }
                NextCluster::Next(next) => {
                    if self.steps >= self.limit {
                        return self.fail(ChainError::StepLimitExceeded {
                            start: self.start,
                            limit: self.limit,
                        });
                    }
                    self.steps += 1;
                    self.state = ChainState::After(next);
                    Some(Ok(next))
                }
                NextCluster::FreeClusterEncountered => {
                    self.fail(ChainError::FreeClusterInChain { cluster })
                }
                NextCluster::Invalid => {
                    self.fail(ChainError::InvalidLink { cluster, next: cluster })
                }
                NextCluster::IoError(e) => self.fail(ChainError::Device(e)),
            },
        }
    }
}

/// Collect a whole chain into a vector.
pub fn read_cluster_chain<D: BlockDevice + ?Sized>(
    device: &D,
    geometry: &VolumeGeometry,
    start: u32,
    limit: u32,
) -> Result<Vec<u32>, ChainError> {
    ClusterChain::new(device, geometry, start, limit).collect()
}
