pub mod config;
pub mod device;
pub mod error;

pub use config::NavigatorConfig;
pub use device::{BlockDevice, ImageFile, MemoryImage};
pub use error::{
    ChainError, DeviceError, ErrorKind, FileError, NavError, NavResult, ParseError, PathError,
};
