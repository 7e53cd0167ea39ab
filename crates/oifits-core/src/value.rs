use std::fmt;

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes, trailing
    /// blanks removed).
    String(String),
    /// FITS complex value `(real, imaginary)`.
    Complex(f64, f64),
}

impl Value {
    /// Numeric view of the value. Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view of the value. Floats are accepted when they hold an
    /// integral number, as some writers emit `NAXIS1 = 512.`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Complex(re, im) => write!(f, "({re}, {im})"),
        }
    }
}

// ── Parsing ──

/// Locate the comment that follows a value, if any.
///
/// The standard separator is ` / ` but files written by IDL and others drop
/// the trailing space, so ` /` is accepted.
fn comment_after(bytes: &[u8]) -> (usize, Option<&str>) {
    let pos = bytes.windows(2).position(|w| w == b" /");
    match pos {
        Some(i) => {
            let mut start = i + 2;
            if bytes.get(start) == Some(&b' ') {
                start += 1;
            }
            let comment = std::str::from_utf8(&bytes[start..])
                .ok()
                .map(str::trim_end)
                .filter(|s| !s.is_empty());
            (i, comment)
        }
        None => (bytes.len(), None),
    }
}

/// Parse a quoted string starting at `field[0] == '\''`.
fn parse_string(field: &[u8]) -> (Value, Option<&str>) {
    let mut text = String::new();
    let mut i = 1;
    while i < field.len() {
        if field[i] == b'\'' {
            if field.get(i + 1) == Some(&b'\'') {
                text.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            break;
        }
        text.push(field[i] as char);
        i += 1;
    }
    // An unterminated string keeps whatever was read.
    let (_, comment) = comment_after(&field[i.min(field.len())..]);
    let trimmed = text.trim_end().to_string();
    (Value::String(trimmed), comment)
}

fn parse_float_str(s: &str) -> Option<f64> {
    s.replace(['D', 'd'], "E").parse::<f64>().ok()
}

fn parse_complex(text: &str) -> Option<Value> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let (re, im) = inner.split_once(',')?;
    Some(Value::Complex(
        parse_float_str(re.trim())?,
        parse_float_str(im.trim())?,
    ))
}

/// Parse the 70-byte value field of a card (bytes 10..80).
///
/// Returns `None` for an undefined value (an all-blank field) or text that is
/// none of the FITS value types.
pub fn parse_value(field: &[u8]) -> Option<(Value, Option<&str>)> {
    let start = field.iter().position(|&b| b != b' ')?;
    let field = &field[start..];
    if field[0] == b'\'' {
        return Some(parse_string(field));
    }

    let (end, comment) = comment_after(field);
    let text = std::str::from_utf8(&field[..end]).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    let value = match text {
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        t if t.starts_with('(') => parse_complex(t)?,
        t if !t.contains(['.', 'E', 'e', 'D', 'd']) => match t.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Float(parse_float_str(t)?),
        },
        t => Value::Float(parse_float_str(t)?),
    };
    Some((value, comment))
}

// ── Formatting ──

/// Serialize a [`Value`] into the 70-byte value field of a card.
///
/// Numbers and logicals are right-justified in the first 20 bytes; strings
/// start with a quote at byte 0 and are padded to at least 8 characters.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];
    match value {
        Value::Logical(b) => buf[19] = if *b { b'T' } else { b'F' },
        Value::Integer(n) => right_justify(n.to_string().as_bytes(), &mut buf[..20]),
        Value::Float(f) => right_justify(format_float(*f, 20).as_bytes(), &mut buf[..20]),
        Value::String(s) => write_string(s, &mut buf),
        Value::Complex(re, im) => {
            let text = format!("({}, {})", format_float(*re, 20), format_float(*im, 20));
            right_justify(text.as_bytes(), &mut buf[..50]);
        }
    }
    buf
}

fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..].copy_from_slice(&src[..len]);
}

/// Shortest exact representation if it fits, otherwise the widest precision
/// that does.
fn format_float(f: f64, max_len: usize) -> String {
    if f == 0.0 {
        return "0.0".to_string();
    }
    if !f.is_finite() {
        // Not representable in FITS; the writer never emits these.
        return "0.0".to_string();
    }
    let shortest = format!("{f:E}");
    let shortest = match shortest.split_once('E') {
        Some((mantissa, exp)) if !mantissa.contains('.') => format!("{mantissa}.0E{exp}"),
        _ => shortest,
    };
    if shortest.len() <= max_len {
        return shortest;
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{f:.precision$E}");
        if s.len() <= max_len || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_string(s: &str, buf: &mut [u8; 70]) {
    buf[0] = b'\'';
    let mut pos = 1;
    for ch in s.bytes() {
        let needed = if ch == b'\'' { 2 } else { 1 };
        if pos + needed >= 70 {
            break;
        }
        buf[pos] = ch;
        if ch == b'\'' {
            buf[pos + 1] = b'\'';
        }
        pos += needed;
    }
    // Closing quote no earlier than column 20 of the card.
    let close = pos.max(9);
    buf[close] = b'\'';
}
