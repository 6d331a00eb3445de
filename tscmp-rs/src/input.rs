//! Opening the compared files.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use log::{debug, info};
use thiserror::Error;

/// Name given on the command line for the standard input.
pub const STDIN_NAME: &str = "-";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Cannot open {name}: {source}")]
    Open { name: String, source: io::Error },
    #[error("Cannot move to offset {offset} in {name}: {source}")]
    Seek {
        name: String,
        offset: u64,
        source: io::Error,
    },
    #[error("Both files cannot be read from the standard input")]
    StdinTwice,
}

/// A file ready to be read from its start offset.
pub struct Input {
    /// Display name.
    pub name: String,
    /// Bytes left after the start offset, when known.
    pub len: Option<u64>,
    pub reader: Box<dyn Read>,
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Input")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Open `path` (or the standard input for `-`) and skip `offset` bytes.
pub fn open_input(path: &str, offset: u64) -> Result<Input, InputError> {
    if path == STDIN_NAME {
        let name = "standard input".to_string();
        let mut reader: Box<dyn Read> = Box::new(io::stdin().lock());
        skip_bytes(&mut reader, offset, &name)?;
        return Ok(Input {
            name,
            len: None,
            reader,
        });
    }

    let name = path.to_string();
    let mut file = File::open(path).map_err(|source| InputError::Open {
        name: name.clone(),
        source,
    })?;
    let file_len = file.metadata().ok().map(|m| m.len());
    if offset > 0 {
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| InputError::Seek {
                name: name.clone(),
                offset,
                source,
            })?;
    }
    let len = file_len.map(|l| l.saturating_sub(offset));
    info!("{}: opened, {} bytes to compare", name, len.unwrap_or(0));
    Ok(Input {
        name,
        len,
        reader: Box::new(BufReader::new(file)),
    })
}

/// Open both files, refusing to read the standard input twice.
pub fn open_inputs(path1: &str, path2: &str, offset: u64) -> Result<[Input; 2], InputError> {
    if path1 == STDIN_NAME && path2 == STDIN_NAME {
        return Err(InputError::StdinTwice);
    }
    Ok([open_input(path1, offset)?, open_input(path2, offset)?])
}

/// Consume `offset` bytes of a non-seekable stream.
fn skip_bytes<R: Read>(reader: &mut R, offset: u64, name: &str) -> Result<(), InputError> {
    if offset == 0 {
        return Ok(());
    }
    let skipped = io::copy(&mut reader.by_ref().take(offset), &mut io::sink()).map_err(|source| {
        InputError::Seek {
            name: name.to_string(),
            offset,
            source,
        }
    })?;
    if skipped < offset {
        debug!("{}: only {} bytes before offset {}", name, skipped, offset);
    }
    Ok(())
}
