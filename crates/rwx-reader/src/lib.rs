#![warn(missing_docs)]

//! RWX model reader.
//!
//! Parses the line-oriented RWX scene description (nested clumps,
//! transforms, incremental materials, reusable protos) into an
//! [`rwx_ir::Clump`] tree. Geometry is not resolved here: transforms are
//! recorded in declaration order and indices stay local to their clump.
//!
//! # Example
//!
//! ```no_run
//! use rwx_reader::read_rwx;
//!
//! let model = read_rwx("tree.rwx").unwrap();
//! println!("{} triangles", model.triangle_count());
//! ```

mod error;
mod lexer;
mod parser;
mod proto;
mod reader;
mod settings;

pub use error::{LimitKind, ReadError, Result};
pub use lexer::{parse_number, LineRecord, Scanner};
pub use parser::{Keyword, Parser};
pub use proto::{ProtoTable, Token, TokenStream};
pub use reader::{read_rwx, read_rwx_from_buffer, read_rwx_from_reader, read_rwx_with_settings};
pub use settings::{ReaderSettings, DEFAULT_SKIP_KEYWORDS};
