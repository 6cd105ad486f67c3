use thiserror::Error;

/// Failure reported by a [`crate::BlockDevice`].
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Short read at offset {offset:#x}: wanted {requested} bytes, got {got}")]
    ShortRead {
        offset: u64,
        requested: u32,
        got: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boot sector decoding failures. Fatal at mount time.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Boot sector truncated while reading {0}")]
    Truncated(&'static str),

    #[error(
        "Degenerate geometry: {bytes_per_sector} bytes per sector, \
         {sectors_per_cluster} sectors per cluster"
    )]
    DegenerateGeometry {
        bytes_per_sector: u16,
        sectors_per_cluster: u8,
    },

    #[error("Root cluster {0:#x} is outside the data region")]
    InvalidRootCluster(u32),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

/// A cluster chain that cannot be walked. Treated as on-disk corruption.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Cluster chain starting at {start} exceeds {limit} steps (cyclic or corrupt)")]
    StepLimitExceeded { start: u32, limit: u32 },

    #[error("Free cluster encountered in chain after cluster {cluster}")]
    FreeClusterInChain { cluster: u32 },

    #[error("Cluster {cluster} links to out-of-range cluster {next:#x}")]
    InvalidLink { cluster: u32, next: u32 },

    #[error("Chain starts at out-of-range cluster {0:#x}")]
    InvalidStart(u32),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Directory depth limit of {limit} reached")]
    TooDeep { limit: usize },

    #[error("{0}")]
    Chain(#[from] ChainError),
}

/// Open-file table failures.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File already opened: {0}")]
    AlreadyOpen(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Too many open files (limit {limit})")]
    TooManyOpenFiles { limit: usize },

    #[error("Invalid offset: {0}")]
    InvalidOffset(i64),

    #[error("File not opened: {0}")]
    NotOpen(String),

    #[error("File not opened for reading: {0}")]
    NotReadable(String),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("{0}")]
    Path(#[from] PathError),

    #[error("{0}")]
    Chain(#[from] ChainError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

/// Coarse classification used by callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Lookup,
    Usage,
}

#[derive(Debug, Error)]
pub enum NavError {
    #[error("{0}")]
    Device(#[from] DeviceError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Chain(#[from] ChainError),

    #[error("{0}")]
    Path(#[from] PathError),

    #[error("{0}")]
    File(#[from] FileError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NavError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NavError::Device(_) => ErrorKind::Io,
            NavError::Parse(ParseError::Device(_)) => ErrorKind::Io,
            NavError::Parse(_) => ErrorKind::Format,
            NavError::Chain(e) => chain_kind(e),
            NavError::Path(e) => path_kind(e),
            NavError::File(e) => match e {
                FileError::NotFound(_) | FileError::IsADirectory(_) => ErrorKind::Lookup,
                FileError::Path(p) => path_kind(p),
                FileError::Chain(c) => chain_kind(c),
                FileError::Device(_) => ErrorKind::Io,
                _ => ErrorKind::Usage,
            },
            NavError::Configuration(_) | NavError::Serialization(_) => ErrorKind::Usage,
        }
    }
}

fn chain_kind(e: &ChainError) -> ErrorKind {
    match e {
        ChainError::Device(_) => ErrorKind::Io,
        _ => ErrorKind::Format,
    }
}

fn path_kind(e: &PathError) -> ErrorKind {
    match e {
        PathError::Chain(c) => chain_kind(c),
        PathError::TooDeep { .. } => ErrorKind::Usage,
        _ => ErrorKind::Lookup,
    }
}

pub type NavResult<T> = Result<T, NavError>;
