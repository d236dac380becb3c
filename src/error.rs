use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Exit status for usage and file errors.
pub const USAGE_EXIT: u8 = 2;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
    #[display("map file not found: {}", _0.display())]
    MissingFile(#[error(not(source))] PathBuf),
    #[display("failed to load map file: {}", _0.display())]
    UnreadableFile(#[error(not(source))] PathBuf),
    #[display("configuration error")]
    Config,
    #[display("search failed (HTTP {_0})")]
    Search(#[error(not(source))] u16),
    #[display("crawl failed")]
    Crawl,
    #[display("could not render output")]
    Output,
}

impl ErrorKind {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::MissingFile(_) | Self::UnreadableFile(_) | Self::Config => USAGE_EXIT,
            Self::Search(400) => USAGE_EXIT,
            Self::Search(_) | Self::Crawl | Self::Output => 1,
        }
    }
}
