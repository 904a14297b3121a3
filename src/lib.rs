//! Server configuration parser.
//!
//! Reads the main block of a server configuration file (`daemon`,
//! `worker_processes`, `timer_resolution`, `error_log`, `env`, and the
//! `http` / `events` block keywords) into a [`MainConfig`]. Path-shaped
//! arguments are decoded with the RFC2396 grammar in [`uri`].
//!
//! ```text
//! daemon on;
//! worker_processes 8;
//! timer_resolution 100ms;
//! error_log logs/error.log;
//! env PATH=bin;
//! events
//! http
//! ```
#[macro_use]
extern crate log;

mod config;
mod error;
pub mod lexical;
mod parser;
mod tokenizer;
pub mod uri;

pub use config::{from_file, parse, BlockBody, EventBlock, HttpBlock, MainConfig};
pub use error::{format_message, Error, ErrorKind, Result};
pub use parser::{Directive, DirectiveSet};
pub use uri::{parse_abs_path, parse_absolute_uri, parse_absolute_uri_with_scheme, SchemeRegistry, Uri};
