//! Entry points: read an RWX model from a path, buffer or stream.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rwx_ir::Clump;

use crate::error::Result;
use crate::parser::Parser;
use crate::settings::ReaderSettings;

/// Read an RWX model from a path with default settings.
///
/// # Arguments
///
/// * `path` - Path to the `.rwx` file
///
/// # Returns
///
/// The root clump of the model.
pub fn read_rwx(path: impl AsRef<Path>) -> Result<Clump> {
    read_rwx_with_settings(path, &ReaderSettings::default())
}

/// Read an RWX model from a path.
///
/// The file is closed when this returns, on success or failure.
pub fn read_rwx_with_settings(path: impl AsRef<Path>, settings: &ReaderSettings) -> Result<Clump> {
    let file = File::open(path.as_ref())?;
    log::debug!("reading {}", path.as_ref().display());
    read_rwx_from_reader(BufReader::new(file), settings)
}

/// Read an RWX model from a byte buffer with default settings.
pub fn read_rwx_from_buffer(data: &[u8]) -> Result<Clump> {
    read_rwx_from_reader(data, &ReaderSettings::default())
}

/// Read an RWX model from any buffered stream.
///
/// Each call owns its own proto table, so concurrent reads are independent.
pub fn read_rwx_from_reader<R: BufRead>(input: R, settings: &ReaderSettings) -> Result<Clump> {
    Parser::parse(input, settings)
}
