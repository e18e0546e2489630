use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal engine errors. None of these are recoverable at this layer; the
/// embedding virtual machine catches them at its boundary for logging.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("i/o failure on {} (party {party}, thread {thread})", .path.display())]
    Io {
        path: PathBuf,
        party: usize,
        thread: usize,
        #[source]
        source: io::Error,
    },
    #[error(
        "insufficient preprocessing: party {party} needs {needed} more bytes \
         at tape offset {offset} (batch size {batch_size})"
    )]
    InsufficientPreprocessing {
        party: usize,
        offset: u64,
        batch_size: usize,
        needed: usize,
    },
    #[error("insufficient data: {needed} bytes required, {left} left in buffer")]
    InsufficientData { needed: usize, left: usize },
    #[error("communication failure")]
    Communication(#[from] astra_channel::CommunicationError),
    #[error("protocol assertion failed: {0}")]
    Assertion(&'static str),
}

impl From<astra_channel::multi::Error> for Error {
    fn from(err: astra_channel::multi::Error) -> Self {
        Error::Communication(err.into())
    }
}
