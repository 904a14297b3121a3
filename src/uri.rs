//! RFC2396 URI grammar.
//!
//! Hand-written recursive descent over a byte buffer. Every production
//! advances the cursor on success and leaves it at the point of failure
//! on error. Only the scheme-less `net_path` / `abs_path` forms are used
//! by the configuration parser; the scheme-aware entry point exists for
//! callers that want full absolute URIs.
//!
//! ```text
//! absoluteURI   = [ scheme ":" ] hier_part [ "#" fragment ]
//! hier_part     = ( net_path | abs_path ) [ "?" query ]
//! net_path      = "//" server [ abs_path ]
//! server        = host [ ":" port ]
//! host          = IPv4address | hostname
//! abs_path      = "/" path_segments
//! path_segments = segment *( "/" segment )
//! segment       = *pchar *( ";" param )
//! ```
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::lexical::{pchar_len, uric_len};

const DEFAULT_PORT: u16 = 80;

/// A decoded URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uri {
    /// Only set by [`parse_absolute_uri_with_scheme`].
    pub scheme: Option<String>,
    pub host: String,
    pub port: u16,
    /// Path segments and `;` parameters, in order, as one flat list.
    pub abs_path: Vec<String>,
    /// Repeated keys accumulate. A value without a `=` is stored
    /// under the empty key.
    pub query: HashMap<String, Vec<String>>,
    pub fragment: String,
}

impl Default for Uri {
    fn default() -> Uri {
        Uri {
            scheme: None,
            host: String::new(),
            port: DEFAULT_PORT,
            abs_path: Vec::new(),
            query: HashMap::new(),
            fragment: String::new(),
        }
    }
}

impl Uri {
    /// Parse a complete network-path or absolute-path URI.
    ///
    /// Unlike [`parse_absolute_uri`] the whole input must be consumed.
    pub fn parse(s: &str) -> Result<Uri> {
        let mut cursor = 0;
        let uri = parse_absolute_uri(s, &mut cursor)?;
        if cursor < s.len() {
            return Err(Error::new(ErrorKind::InvalidUriSyntax, s, cursor, "unexpected character"));
        }
        Ok(uri)
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Uri> {
        Uri::parse(s)
    }
}

/// Set of URI schemes we accept.
#[derive(Debug, Clone)]
pub struct SchemeRegistry {
    schemes: HashSet<String>,
}

static SCHEMES: Lazy<SchemeRegistry> = Lazy::new(|| {
    SchemeRegistry::new(&["http", "https", "ftp", "file", "mailto", "news", "telnet", "ws", "wss"])
});

impl SchemeRegistry {
    pub fn new(names: &[&str]) -> SchemeRegistry {
        SchemeRegistry {
            schemes: names.iter().map(|n| n.to_ascii_lowercase()).collect(),
        }
    }

    /// The registry consulted by [`parse_absolute_uri_with_scheme`].
    pub fn global() -> &'static SchemeRegistry {
        &SCHEMES
    }

    /// Scheme names are case-insensitive.
    pub fn is_valid_scheme(&self, name: &str) -> bool {
        self.schemes.contains(&name.to_ascii_lowercase())
    }
}

/// Parse `hier_part [ "#" fragment ]` starting at `cursor`.
///
/// On return `cursor` points just past what was consumed, or at the
/// point of failure.
pub fn parse_absolute_uri(input: &str, cursor: &mut usize) -> Result<Uri> {
    run(input, cursor, |p| p.absolute_uri(false))
}

/// Parse `scheme ":" hier_part [ "#" fragment ]` starting at `cursor`.
pub fn parse_absolute_uri_with_scheme(input: &str, cursor: &mut usize) -> Result<Uri> {
    run(input, cursor, |p| p.absolute_uri(true))
}

/// Parse an `abs_path` starting at `cursor`, returning its segments.
pub fn parse_abs_path(input: &str, cursor: &mut usize) -> Result<Vec<String>> {
    run(input, cursor, |p| {
        let mut path = Vec::new();
        if !p.abs_path(&mut path) {
            return Err(p.error(ErrorKind::InvalidUriSyntax, "cannot find \"/\""));
        }
        Ok(path)
    })
}

fn run<T>(input: &str, cursor: &mut usize, f: impl FnOnce(&mut UriParser) -> Result<T>) -> Result<T> {
    if *cursor > input.len() {
        return Err(Error::new(ErrorKind::InvalidUriSyntax, input, *cursor, "cursor is past the end of input"));
    }
    let mut parser = UriParser::new(input);
    parser.pos = *cursor;
    let res = f(&mut parser);
    *cursor = parser.pos;
    res
}

pub(crate) struct UriParser<'a> {
    input: &'a str,
    data: &'a [u8],
    pos: usize,
    // offset of `input` inside the buffer errors are reported against.
    base: usize,
}

impl<'a> UriParser<'a> {
    pub fn new(input: &'a str) -> UriParser<'a> {
        UriParser::with_base(input, 0)
    }

    pub fn with_base(input: &'a str, base: usize) -> UriParser<'a> {
        UriParser {
            input,
            data: input.as_bytes(),
            pos: 0,
            base,
        }
    }

    /// `abs_path` that must span the entire input.
    pub fn complete_abs_path(&mut self) -> Result<Vec<String>> {
        let mut path = Vec::new();
        if !self.abs_path(&mut path) {
            return Err(self.error(ErrorKind::InvalidUriSyntax, "cannot find \"/\""));
        }
        if self.pos < self.data.len() {
            return Err(self.error(ErrorKind::InvalidUriSyntax, "is invalid path syntax"));
        }
        Ok(path)
    }

    fn save_pos(&self) -> usize {
        self.pos
    }

    fn restore_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, f: impl Fn(u8) -> bool) -> usize {
        let start = self.pos;
        while self.peek().map_or(false, &f) {
            self.pos += 1;
        }
        self.pos - start
    }

    // Consumed ranges only ever contain ASCII, but the caller's
    // cursor may start anywhere.
    fn text(&self, start: usize, end: usize) -> String {
        self.data
            .get(start..end)
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .unwrap_or_default()
    }

    fn error(&self, kind: ErrorKind, msg: &str) -> Error {
        self.error_at(kind, self.pos, msg)
    }

    fn error_at(&self, kind: ErrorKind, pos: usize, msg: &str) -> Error {
        Error::new(kind, self.input, self.base + pos, msg)
    }

    fn absolute_uri(&mut self, with_scheme: bool) -> Result<Uri> {
        let mut uri = Uri::default();
        if with_scheme {
            uri.scheme = Some(self.scheme()?);
            if !self.eat(b':') {
                return Err(self.error(ErrorKind::InvalidUriSyntax, "cannot find \":\""));
            }
        }
        self.hier_part(&mut uri)?;
        if uri.abs_path.last().map_or(false, |s| s.is_empty()) {
            uri.abs_path.pop();
        }
        self.fragment(&mut uri);
        debug!("absolute_uri: {:?}", uri);
        Ok(uri)
    }

    // scheme = alpha *( alpha | digit | "+" | "-" | "." )
    fn scheme(&mut self) -> Result<String> {
        let start = self.pos;
        if self.peek().map_or(false, |c| c.is_ascii_alphabetic()) {
            self.eat_while(|c| c.is_ascii_alphanumeric() || c == b'+' || c == b'-' || c == b'.');
        }
        let scheme = self.text(start, self.pos);
        if scheme.is_empty() || !SchemeRegistry::global().is_valid_scheme(&scheme) {
            return Err(self.error(ErrorKind::InvalidUriSyntax, "is invalid scheme syntax"));
        }
        Ok(scheme)
    }

    fn hier_part(&mut self, uri: &mut Uri) -> Result<()> {
        let pos = self.save_pos();
        if !self.net_path(uri)? {
            self.restore_pos(pos);
            if !self.abs_path(&mut uri.abs_path) {
                return Err(self.error(ErrorKind::InvalidUriSyntax, "is invalid uri syntax"));
            }
        }
        self.query(uri);
        Ok(())
    }

    // Ok(false) means "not a net_path", so the caller can try abs_path.
    fn net_path(&mut self, uri: &mut Uri) -> Result<bool> {
        if !self.eat(b'/') {
            return Ok(false);
        }
        if !self.eat(b'/') {
            self.pos -= 1;
            return Ok(false);
        }
        trace!("net_path at {}", self.pos);
        self.server(uri)?;
        self.abs_path(&mut uri.abs_path);
        Ok(true)
    }

    fn server(&mut self, uri: &mut Uri) -> Result<()> {
        uri.host = match self.ipv4_address() {
            Some(host) => host,
            None => self.hostname()?,
        };
        uri.port = self.port()?;
        Ok(())
    }

    // Four dot-separated digit groups. Ranges are not checked, so
    // 999.999.999.999 is accepted. Restores the cursor on mismatch.
    fn ipv4_address(&mut self) -> Option<String> {
        let start = self.save_pos();
        for i in 0..4 {
            if (i > 0 && !self.eat(b'.')) || self.eat_while(|c| c.is_ascii_digit()) == 0 {
                self.restore_pos(start);
                return None;
            }
        }
        // "1.2.3.4a.com" is a hostname.
        if self.peek().map_or(false, |c| c.is_ascii_alphanumeric() || c == b'-' || c == b'.') {
            self.restore_pos(start);
            return None;
        }
        Some(self.text(start, self.pos))
    }

    // hostname = domainlabel *( "." domainlabel ), last label starts with alpha.
    fn hostname(&mut self) -> Result<String> {
        let start = self.pos;
        self.domainlabel()?;
        while self.eat(b'.') {
            self.domainlabel()?;
        }
        let host = self.text(start, self.pos);
        let top = host.rfind('.').map_or(start, |dot| start + dot + 1);
        if !self.data[top].is_ascii_alphabetic() {
            return Err(self.error_at(ErrorKind::InvalidHostSyntax, top, "is invalid toplabel syntax"));
        }
        Ok(host)
    }

    fn domainlabel(&mut self) -> Result<()> {
        if !self.peek().map_or(false, |c| c.is_ascii_alphanumeric()) {
            return Err(self.error(ErrorKind::InvalidHostSyntax, "is invalid domainlabel syntax"));
        }
        self.eat_while(|c| c.is_ascii_alphanumeric() || c == b'-');
        Ok(())
    }

    fn port(&mut self) -> Result<u16> {
        if !self.eat(b':') {
            return Ok(DEFAULT_PORT);
        }
        let start = self.pos;
        if self.eat_while(|c| c.is_ascii_digit()) == 0 {
            return Err(self.error(ErrorKind::InvalidPortSyntax, "is invalid port syntax"));
        }
        self.text(start, self.pos)
            .parse::<u16>()
            .map_err(|_| self.error_at(ErrorKind::InvalidPortSyntax, start, "port number out of range"))
    }

    fn abs_path(&mut self, path: &mut Vec<String>) -> bool {
        if !self.eat(b'/') {
            return false;
        }
        self.segment(path);
        while self.eat(b'/') {
            self.segment(path);
        }
        true
    }

    // Parameters are pushed as siblings of their segment.
    fn segment(&mut self, path: &mut Vec<String>) {
        path.push(self.pchars());
        while self.eat(b';') {
            path.push(self.pchars());
        }
    }

    fn pchars(&mut self) -> String {
        let start = self.pos;
        loop {
            let n = pchar_len(self.data, self.pos);
            if n == 0 {
                break;
            }
            self.pos += n;
        }
        self.text(start, self.pos)
    }

    fn query(&mut self, uri: &mut Uri) {
        if !self.eat(b'?') {
            return;
        }
        let mut start = self.pos;
        let mut key: Option<String> = None;
        loop {
            let n = uric_len(self.data, self.pos);
            if n == 0 {
                break;
            }
            match self.data[self.pos] {
                b'=' if key.is_none() => {
                    key = Some(self.text(start, self.pos));
                    start = self.pos + 1;
                }
                b'&' => {
                    let value = self.text(start, self.pos);
                    uri.query.entry(key.take().unwrap_or_default()).or_default().push(value);
                    start = self.pos + 1;
                }
                _ => {}
            }
            self.pos += n;
        }
        let value = self.text(start, self.pos);
        uri.query.entry(key.unwrap_or_default()).or_default().push(value);
    }

    fn fragment(&mut self, uri: &mut Uri) {
        if !self.eat(b'#') {
            return;
        }
        let start = self.pos;
        loop {
            let n = uric_len(self.data, self.pos);
            if n == 0 {
                break;
            }
            self.pos += n;
        }
        uri.fragment = self.text(start, self.pos);
    }
}
