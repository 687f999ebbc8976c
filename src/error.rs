use std::path::PathBuf;

/// Custom Result type for sadb operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the sadb library, encompassing all possible error cases
/// that can occur while building, reading, or extracting annotation databases.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to database and source headers
    #[error("Error processing header: {0}")]
    HeaderError(#[from] HeaderError),

    /// Errors that occur during write operations
    #[error("Error writing database: {0}")]
    WriteError(#[from] WriteError),

    /// Errors that occur during read operations
    #[error("Error reading database: {0}")]
    ReadError(#[from] ReadError),

    /// Errors related to the position index
    #[error("Error processing index: {0}")]
    IndexError(#[from] IndexError),

    /// Errors raised while merging annotation sources
    #[error("Error merging sources: {0}")]
    MergeError(#[from] MergeError),

    /// Errors raised while parsing text annotation sources
    #[error("Error parsing source: {0}")]
    SourceError(#[from] SourceError),

    /// I/O errors tied to a specific file and operation
    #[error("Unable to {operation} {}: {source}", path.display())]
    FileIo {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// UTF-8 conversion errors
    #[error("Error with UTF8: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}
impl Error {
    /// Checks if the error is a refusal to read a database of another format or data version
    ///
    /// This is useful for distinguishing stale databases (which must be rebuilt)
    /// from corrupt or missing ones.
    #[must_use]
    pub fn is_version_mismatch(&self) -> bool {
        match self {
            Self::HeaderError(err) => err.is_version_mismatch(),
            Self::IndexError(
                IndexError::UnsupportedVersion { .. } | IndexError::UnsupportedFormat { .. },
            ) => true,
            _ => false,
        }
    }
}

/// Attaches file context to an I/O result
pub(crate) trait IoContext<T> {
    fn with_path(self, operation: &'static str, path: &std::path::Path) -> Result<T>;
}
impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, operation: &'static str, path: &std::path::Path) -> Result<T> {
        self.map_err(|source| Error::FileIo {
            operation,
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Errors specific to processing and validating headers
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic number in the header does not match the expected value
    #[error("Invalid file magic: {0:?}")]
    InvalidMagic(Vec<u8>),

    /// The binary layout version is not supported by this reader
    #[error("Invalid format version: {found} - expecting {expected}")]
    InvalidFormatVersion { expected: u8, found: u8 },

    /// The data version recorded in the header is not the one this reader implements
    #[error("Unsupported data version: {found} - expecting {expected}")]
    DataVersionMismatch { expected: u16, found: u16 },

    /// An unknown genome assembly code was found
    #[error("Unknown genome assembly code: {0}")]
    UnknownAssembly(u8),

    /// An unknown interval category code was found
    #[error("Unknown interval category code: {0}")]
    UnknownCategory(u8),

    /// A length-prefixed field claims more bytes than are available
    #[error("Field length {0} exceeds the remaining header bytes")]
    FieldTooLong(usize),
}
impl HeaderError {
    #[must_use]
    pub fn is_version_mismatch(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormatVersion { .. } | Self::DataVersionMismatch { .. }
        )
    }
}

/// Errors that can occur while reading an annotation database
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file being read is not a regular file (e.g., it might be a directory or special file)
    #[error("File is not regular")]
    IncompatibleFile,

    /// The file appears to be truncated or corrupted
    #[error(
        "Number of bytes in file does not match expectation - possibly truncated at byte pos {0}"
    )]
    FileTruncation(usize),

    /// When a block header contains an invalid magic number
    #[error("Unexpected block magic number found at position {0}")]
    InvalidBlockMagic(u64),

    /// The decompressed block does not match the sizes recorded in its header
    #[error("Corrupt block at position {offset}: expected {expected} bytes, found {found}")]
    CorruptBlock {
        offset: u64,
        expected: u64,
        found: u64,
    },

    /// A requested position range is empty or starts at zero
    #[error("Invalid position range {begin}-{end}")]
    InvalidRange { begin: u32, end: u32 },

    /// The side-channel section tag was not the expected one
    #[error("Unexpected section tag {found} (expected {expected})")]
    UnexpectedSection { expected: u8, found: u8 },
}

/// Errors that can occur while writing an annotation database
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// Positions must be written in strictly increasing order
    #[error("Position {position} written after position {previous} - positions must be strictly increasing")]
    NonIncreasingPosition { previous: u32, position: u32 },

    /// When a record is too large to fit in a block of the configured size
    ///
    /// The first parameter is the record size, the second is the maximum block size
    #[error(
        "Encountered a record with encoded size {0} but the maximum block size is {1}. Rerun with increased block size."
    )]
    RecordSizeExceedsMaximumBlockSize(usize, usize),

    /// A position of zero was supplied (positions are 1-based)
    #[error("Position 0 is not a valid 1-based coordinate")]
    ZeroPosition,

    /// Attempted to write after the writer was finished
    #[error("Writer has already been finished")]
    AlreadyFinished,
}

/// Errors related to the database index
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// When the magic number in the index doesn't match the expected value
    #[error("Invalid index magic: {0:?}")]
    InvalidMagic([u8; 8]),

    /// The index was written by an incompatible version
    #[error("Unsupported index data version: {found} - expecting {expected}")]
    UnsupportedVersion { expected: u16, found: u16 },

    /// The index uses a binary layout this reader does not implement
    #[error("Unsupported index format version: {found} - expecting {expected}")]
    UnsupportedFormat { expected: u8, found: u8 },

    /// Index entries could not be cast from their byte representation
    #[error("Unable to cast bytes to index entries - byte length {0} is not a multiple of the entry size")]
    IndexCastingError(usize),

    /// The number of decoded entries does not match the header
    #[error("Index declares {expected} blocks but {found} were decoded")]
    EntryCountMismatch { expected: u64, found: u64 },
}

/// Errors raised while merging annotation sources
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    /// A source emitted a key that sorts before its previous one
    #[error("Source {source_name} is unsorted on {reference}: {found} follows {previous}")]
    UnsortedSource {
        source_name: String,
        reference: String,
        previous: String,
        found: String,
    },

    /// Sources declare different genome assemblies
    #[error("Inconsistent genome assemblies: {first_source} is {first} but {other_source} is {other}")]
    AssemblyMismatch {
        first_source: String,
        first: String,
        other_source: String,
        other: String,
    },

    /// A chromosome name is not known to the reference dictionary
    #[error("Reference sequence {0} is not present in the reference dictionary")]
    UnknownReference(String),

    /// A chromosome task failed
    #[error("Failed to build database for {reference}: {source}")]
    ChromosomeFailed {
        reference: String,
        #[source]
        source: Box<Error>,
    },

    /// A worker thread panicked
    #[error("Worker thread panicked while merging")]
    WorkerPanicked,
}

/// Errors raised while parsing text annotation sources
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// A data line could not be parsed
    #[error("{path}:{line}: {message}")]
    Malformed {
        path: String,
        line: usize,
        message: String,
    },

    /// A required header key was not present
    #[error("{path}: missing required header key '{key}'")]
    MissingHeaderKey { path: String, key: &'static str },
}
