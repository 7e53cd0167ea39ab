//! FITS header cards and the ordered header they form.

use crate::block::{pad_to_block, BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE, HEADER_PAD_BYTE};
use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, Value};

// ── Types ──

/// One 80-byte keyword record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Keyword name, trimmed (at most 8 ASCII characters).
    pub keyword: String,
    /// The parsed value, if the card has a value indicator (`= ` in bytes 8..10).
    pub value: Option<Value>,
    pub comment: Option<String>,
}

impl Card {
    pub fn new(keyword: &str, value: Value, comment: Option<&str>) -> Self {
        Card {
            keyword: keyword.to_string(),
            value: Some(value),
            comment: comment.map(str::to_string),
        }
    }

    /// A COMMENT, HISTORY or blank-keyword card.
    pub fn commentary(keyword: &str, text: &str) -> Self {
        Card {
            keyword: keyword.to_string(),
            value: None,
            comment: (!text.is_empty()).then(|| text.to_string()),
        }
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    /// Returns `true` for COMMENT, HISTORY and blank-keyword cards.
    pub fn is_commentary(&self) -> bool {
        matches!(self.keyword.as_str(), "COMMENT" | "HISTORY" | "")
    }
}

/// The ordered cards of one HDU header, END excluded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Header { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// First card carrying `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword == keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn value(&self, keyword: &str) -> Option<&Value> {
        self.get(keyword).and_then(|c| c.value.as_ref())
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.value(keyword).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.value(keyword).and_then(Value::as_f64)
    }

    pub fn get_string(&self, keyword: &str) -> Option<&str> {
        self.value(keyword).and_then(Value::as_str)
    }

    pub fn get_logical(&self, keyword: &str) -> Option<bool> {
        self.value(keyword).and_then(Value::as_bool)
    }

    /// Integer keyword that must be present.
    pub fn require_i64(&self, keyword: &str) -> Result<i64> {
        match self.value(keyword) {
            None => Err(Error::MissingKeyword(keyword.to_string())),
            Some(v) => v.as_i64().ok_or_else(|| {
                Error::InvalidHeader(format!("{keyword} must be an integer, found {v}"))
            }),
        }
    }

    /// Replace the value of the first `keyword` card in place, or append a new
    /// card when none exists.
    pub fn set(&mut self, keyword: &str, value: Value, comment: Option<&str>) {
        match self.cards.iter_mut().find(|c| c.keyword == keyword) {
            Some(card) => {
                card.value = Some(value);
                if comment.is_some() {
                    card.comment = comment.map(str::to_string);
                }
            }
            None => self.cards.push(Card::new(keyword, value, comment)),
        }
    }

    /// Append a card; duplicates are allowed.
    pub fn add(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Remove the first card carrying `keyword`.
    pub fn remove(&mut self, keyword: &str) -> Option<Card> {
        let pos = self.cards.iter().position(|c| c.keyword == keyword)?;
        Some(self.cards.remove(pos))
    }

    /// Parse header blocks from the start of `data` up to and including the
    /// block holding END. Returns the header and the bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Header, usize)> {
        let mut cards = Vec::new();
        for (block_idx, block) in data.chunks_exact(BLOCK_SIZE).enumerate() {
            for raw in block.chunks_exact(CARD_SIZE) {
                let card = parse_card(raw)?;
                if card.is_end() {
                    return Ok((Header { cards }, (block_idx + 1) * BLOCK_SIZE));
                }
                cards.push(card);
            }
        }
        Err(Error::UnexpectedEof)
    }

    /// Serialize into whole header blocks, END card included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity((self.cards.len() / CARDS_PER_BLOCK + 1) * BLOCK_SIZE);
        for card in &self.cards {
            buf.extend_from_slice(&format_card(card));
        }
        buf.extend_from_slice(&format_end_card());
        pad_to_block(&mut buf, HEADER_PAD_BYTE);
        buf
    }
}

// ── Parsing ──

fn text_of(bytes: &[u8]) -> Result<Option<String>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::InvalidHeader("non-ASCII card text".into()))?
        .trim_end();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// Parse a single 80-byte card.
pub fn parse_card(raw: &[u8]) -> Result<Card> {
    if raw.len() != CARD_SIZE {
        return Err(Error::InvalidHeader(format!("card of {} bytes", raw.len())));
    }
    let key_bytes = &raw[..8];
    if !key_bytes
        .iter()
        .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_'))
    {
        return Err(Error::InvalidKeyword(
            String::from_utf8_lossy(key_bytes).into_owned(),
        ));
    }
    let keyword = std::str::from_utf8(key_bytes)
        .map_err(|_| Error::InvalidKeyword(String::from_utf8_lossy(key_bytes).into_owned()))?
        .trim_end()
        .to_string();

    let is_commentary = matches!(keyword.as_str(), "COMMENT" | "HISTORY" | "");
    if keyword == "END" || is_commentary || &raw[8..10] != b"= " {
        let comment = if keyword == "END" { None } else { text_of(&raw[8..])? };
        return Ok(Card {
            keyword,
            value: None,
            comment,
        });
    }

    let field = &raw[10..];
    match parse_value(field) {
        Some((value, comment)) => Ok(Card {
            keyword,
            value: Some(value),
            comment: comment.map(str::to_string),
        }),
        // Undefined value: keep only a trailing comment.
        None => {
            let comment = std::str::from_utf8(field)
                .ok()
                .and_then(|f| f.split_once('/'))
                .map(|(_, c)| c.trim().to_string())
                .filter(|c| !c.is_empty());
            Ok(Card {
                keyword,
                value: None,
                comment,
            })
        }
    }
}

// ── Writing ──

/// Serialize a [`Card`] into an 80-byte card image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    let key = card.keyword.as_bytes();
    let key_len = key.len().min(8);
    buf[..key_len].copy_from_slice(&key[..key_len]);

    match &card.value {
        Some(value) => {
            buf[8] = b'=';
            let mut field = format_value(value);
            if let Some(comment) = &card.comment {
                insert_comment(&mut field, comment);
            }
            buf[10..].copy_from_slice(&field);
        }
        None => {
            if let Some(comment) = &card.comment {
                let bytes = comment.as_bytes();
                let len = bytes.len().min(72);
                buf[8..8 + len].copy_from_slice(&bytes[..len]);
            }
        }
    }
    buf
}

/// Append ` / comment` after the value already in the 70-byte field.
fn insert_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = field
        .iter()
        .rposition(|&b| b != b' ')
        .map(|i| i + 1)
        .unwrap_or(0)
        .max(20);
    let start = content_end + 3;
    if start >= 70 {
        return;
    }
    field[content_end + 1] = b'/';
    let bytes = comment.as_bytes();
    let len = bytes.len().min(70 - start);
    field[start..start + len].copy_from_slice(&bytes[..len]);
}

fn format_end_card() -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..3].copy_from_slice(b"END");
    buf
}
