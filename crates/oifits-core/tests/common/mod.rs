//! Builders for hand-made FITS streams.

#![allow(dead_code)]

use oifits_core::block::{pad_to_block, DATA_PAD_BYTE};
use oifits_core::header::{Card, Header};
use oifits_core::value::Value;

pub fn card(keyword: &str, value: Value) -> Card {
    Card::new(keyword, value, None)
}

pub fn int(keyword: &str, n: i64) -> Card {
    card(keyword, Value::Integer(n))
}

pub fn real(keyword: &str, x: f64) -> Card {
    card(keyword, Value::Float(x))
}

pub fn text(keyword: &str, s: &str) -> Card {
    card(keyword, Value::String(s.to_string()))
}

/// Structural cards of an image HDU with the given axes.
pub fn image_cards(primary: bool, bitpix: i64, axes: &[usize]) -> Vec<Card> {
    let mut cards = if primary {
        vec![card("SIMPLE", Value::Logical(true))]
    } else {
        vec![text("XTENSION", "IMAGE")]
    };
    cards.push(int("BITPIX", bitpix));
    cards.push(int("NAXIS", axes.len() as i64));
    for (i, &n) in axes.iter().enumerate() {
        cards.push(int(&format!("NAXIS{}", i + 1), n as i64));
    }
    if !primary {
        cards.push(int("PCOUNT", 0));
        cards.push(int("GCOUNT", 1));
    }
    cards
}

/// Serialized header followed by the padded data unit.
pub fn hdu(cards: Vec<Card>, data: &[u8]) -> Vec<u8> {
    let mut out = Header::from_cards(cards).to_bytes();
    let mut data = data.to_vec();
    pad_to_block(&mut data, DATA_PAD_BYTE);
    out.extend_from_slice(&data);
    out
}

pub fn f32_be(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn i16_be(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}
