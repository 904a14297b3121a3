//! Character classes.
//!
//! Every predicate looks at `buf[pos]` (and for `%XX` escapes, the two
//! bytes after it). They never advance, and a position past the end of
//! the buffer simply does not match.

// Whitespace inside a line.
pub fn is_wsp(buf: &[u8], pos: usize) -> bool {
    matches!(buf.get(pos), Some(b' ') | Some(b'\t'))
}

/// LF, CR, or the start of a CRLF pair.
pub fn is_line_break(buf: &[u8], pos: usize) -> bool {
    matches!(buf.get(pos), Some(b'\n') | Some(b'\r'))
}

fn line_break_len(buf: &[u8], pos: usize) -> usize {
    match buf.get(pos) {
        Some(b'\r') if buf.get(pos + 1) == Some(&b'\n') => 2,
        Some(b'\n') | Some(b'\r') => 1,
        _ => 0,
    }
}

/// Comment start: `;` (RFC5234 c-nl) or `#`.
pub fn is_comment(buf: &[u8], pos: usize) -> bool {
    matches!(buf.get(pos), Some(b';') | Some(b'#'))
}

/// Skip a `c-nl`: an optional comment, then a line terminator, then the
/// leading whitespace of the next line (folded continuation).
///
/// Returns true if anything was consumed.
pub fn skip_c_nl(buf: &[u8], pos: &mut usize) -> bool {
    let start = *pos;
    if is_comment(buf, *pos) {
        while *pos < buf.len() && !is_line_break(buf, *pos) {
            *pos += 1;
        }
    }
    let n = line_break_len(buf, *pos);
    if n > 0 {
        *pos += n;
        while is_wsp(buf, *pos) {
            *pos += 1;
        }
    }
    *pos != start
}

pub fn is_mark(buf: &[u8], pos: usize) -> bool {
    matches!(
        buf.get(pos),
        Some(b'-') | Some(b'_') | Some(b'.') | Some(b'!') | Some(b'~') | Some(b'*') | Some(b'\'')
            | Some(b'(') | Some(b')')
    )
}

pub fn is_reserved(buf: &[u8], pos: usize) -> bool {
    matches!(buf.get(pos), Some(b';') | Some(b'/') | Some(b'?')) || is_pchar_reserved(buf, pos)
}

// The part of `reserved` that may appear in a pchar.
fn is_pchar_reserved(buf: &[u8], pos: usize) -> bool {
    matches!(
        buf.get(pos),
        Some(b':') | Some(b'@') | Some(b'&') | Some(b'=') | Some(b'+') | Some(b'$') | Some(b',')
    )
}

pub fn is_unreserved(buf: &[u8], pos: usize) -> bool {
    match buf.get(pos) {
        Some(c) if c.is_ascii_alphanumeric() => true,
        _ => is_mark(buf, pos),
    }
}

/// `%` followed by two hex digits. A truncated escape does not match.
pub fn is_escaped(buf: &[u8], pos: usize) -> bool {
    buf.get(pos) == Some(&b'%')
        && buf.get(pos + 1).map_or(false, |c| c.is_ascii_hexdigit())
        && buf.get(pos + 2).map_or(false, |c| c.is_ascii_hexdigit())
}

/// Length of the pchar at `pos`: 3 for an escape, 1 for a plain
/// character, 0 if there is no pchar.
pub fn pchar_len(buf: &[u8], pos: usize) -> usize {
    if is_escaped(buf, pos) {
        3
    } else if is_unreserved(buf, pos) || is_pchar_reserved(buf, pos) {
        1
    } else {
        0
    }
}

pub fn is_pchar(buf: &[u8], pos: usize) -> bool {
    pchar_len(buf, pos) > 0
}

/// Length of the uric at `pos`, 0 if there is none.
pub fn uric_len(buf: &[u8], pos: usize) -> usize {
    match buf.get(pos) {
        Some(b'/') | Some(b'?') => 1,
        _ => pchar_len(buf, pos),
    }
}
