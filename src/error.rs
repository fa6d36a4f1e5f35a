use displaydoc::Display;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// Device did not become ready in time
    Timeout,
    /// Device read failure
    ReadFailure,
    /// Device write failure
    WriteFailure,
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum DataError {
    /// Not a FAT boot sector
    NotFAT,
    /// Broken cluster chain
    ClusterChain,
    /// Malformed metadata
    Metadata,
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum ImplementationError {
    /// ExFAT is detected but not supported
    ExFAT,
    /// Extending a file is not supported
    WriteExtend,
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum InputError {
    /// Filename has no 8.3 translation
    FilenameTranslation,
    /// Invalid path
    InvalidPath,
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum OperationError {
    /// No such file or directory
    NotFound,
    /// Not a directory
    NotADirectory,
    /// Invalid file handle
    InvalidHandle,
}

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum Error {
    /// Device error: {0}
    Device(#[from] DeviceError),
    /// Data error: {0}
    Data(#[from] DataError),
    /// Implementation error: {0}
    Implementation(#[from] ImplementationError),
    /// Input error: {0}
    Input(#[from] InputError),
    /// Operation error: {0}
    Operation(#[from] OperationError),
}

impl Error {
    /// "No filesystem" and "no such file" are expected outcomes of probing
    /// and lookups rather than faults.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Operation(OperationError::NotFound) | Self::Data(DataError::NotFAT))
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for DeviceError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::TimedOut => Self::Timeout,
            std::io::ErrorKind::WriteZero => Self::WriteFailure,
            _ => Self::ReadFailure,
        }
    }
}
