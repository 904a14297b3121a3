use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Error as IoError, ErrorKind as Kind};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::parser::{Directive, DirectiveSet, Parser};

const DEFAULT_WORKER_CONNECTIONS: u32 = 512;

/// The main block of a server configuration.
///
/// Built by [`parse`] or [`from_file`], read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainConfig {
    pub(crate) daemon: bool,
    pub(crate) worker_processes: u32,
    pub(crate) timer_resolution: u64,
    pub(crate) error_log: Vec<String>,
    pub(crate) env: HashMap<String, String>,
    pub(crate) http: Option<HttpBlock>,
    pub(crate) events: Option<EventBlock>,
    #[serde(skip)]
    pub(crate) seen: DirectiveSet,
}

impl Default for MainConfig {
    fn default() -> MainConfig {
        MainConfig {
            daemon: false,
            worker_processes: 4,
            timer_resolution: 100,
            error_log: Vec::new(),
            env: HashMap::new(),
            http: None,
            events: None,
            seen: DirectiveSet::default(),
        }
    }
}

impl MainConfig {
    pub fn is_daemon_on(&self) -> bool {
        self.daemon
    }

    pub fn worker_processes(&self) -> u32 {
        self.worker_processes
    }

    pub fn timer_resolution(&self) -> u64 {
        self.timer_resolution
    }

    /// Path segments of the error log location.
    pub fn error_log(&self) -> &[String] {
        &self.error_log
    }

    /// Look up an `env` variable. Keys are stored lowercased.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(|v| v.as_str())
    }

    pub fn env_map(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// From the `events` block, or the default if there is none.
    pub fn worker_connections(&self) -> u32 {
        self.events
            .as_ref()
            .map_or(DEFAULT_WORKER_CONNECTIONS, |e| e.worker_connections)
    }

    pub fn http_block(&self) -> Option<&HttpBlock> {
        self.http.as_ref()
    }

    pub fn event_block(&self) -> Option<&EventBlock> {
        self.events.as_ref()
    }

    /// Was `directive` present in the configuration.
    pub fn has_directive(&self, directive: Directive) -> bool {
        self.seen.contains(directive)
    }
}

impl fmt::Display for MainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Main Block")?;
        writeln!(f, "\tEnv: ")?;
        let mut env: Vec<_> = self.env.iter().collect();
        env.sort();
        for (key, value) in env {
            writeln!(f, "\t\t{}={}", key, value)?;
        }
        writeln!(f, "\tWorker_process: {}", self.worker_processes)?;
        writeln!(f, "\tDaemon: {}", if self.daemon { "on" } else { "off" })?;
        writeln!(f, "\tTime_resolution: {}", self.timer_resolution)?;
        for segment in &self.error_log {
            writeln!(f, "\tError_log: {}", segment)?;
        }
        Ok(())
    }
}

/// Parser for the body of a nested block.
pub trait BlockBody: Sized {
    /// `pos` points just past the block keyword and is left just past
    /// the block body.
    fn parse_body(input: &str, pos: &mut usize) -> Result<Self>;
}

/// Placeholder for the `http` block.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpBlock {}

/// Placeholder for the `events` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBlock {
    pub worker_connections: u32,
}

impl Default for EventBlock {
    fn default() -> EventBlock {
        EventBlock {
            worker_connections: DEFAULT_WORKER_CONNECTIONS,
        }
    }
}

// The block bodies are not parsed yet, so nothing is consumed.
impl BlockBody for HttpBlock {
    fn parse_body(_input: &str, _pos: &mut usize) -> Result<HttpBlock> {
        Ok(HttpBlock::default())
    }
}

impl BlockBody for EventBlock {
    fn parse_body(_input: &str, _pos: &mut usize) -> Result<EventBlock> {
        Ok(EventBlock::default())
    }
}

/// Read configuration from a string.
pub fn parse(s: &str) -> Result<MainConfig> {
    Parser::from_str(s).parse()
}

/// Read configuration from a file.
pub fn from_file(name: impl Into<String>) -> io::Result<MainConfig> {
    let name = name.into();
    let data = fs::read(&name)
        .map_err(|e| IoError::new(e.kind(), format!("{}: {}", name, e)))?;
    let text = String::from_utf8(data)
        .map_err(|_| IoError::new(Kind::InvalidData, format!("{}: utf-8 error", name)))?;
    parse(&text)
        .map_err(|e| IoError::new(Kind::InvalidData, format!("{}: {}", name, e)))
}
