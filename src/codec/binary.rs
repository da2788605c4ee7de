//! Binary page reader and writer.
//!
//! ```text
//! [count: u16 | u32]                      words that follow, trailer included
//! item*:  [n: f32] [P1 .. Pn: f32]        n = field count
//!         text/graphic items: n = 13 + payload words,
//!         13 fields, then P12 bytes padded with spaces to a word boundary
//! trailer: [0.0] [extra*] [serial] [version] [units] [length] [-9999.0]
//! ```
//!
//! The prefix width follows from the file length: `len % 4 == 2` means a two-byte
//! count, `len % 4 == 0` a four-byte count. The item region ends at the `0.0`
//! sentinel that opens the trailer.

use super::{latin1_decode, latin1_encode, TERMINATOR};
use crate::error::ScoreError;
use crate::item::{Item, ItemType, MAX_FIXED, PAYLOAD_FIXED};

/// Words in a trailer without extra entries.
pub const MIN_TRAILER: usize = 6;

/// Smallest field count written for an ordinary item.
pub const MIN_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    pub serial: f32,
    pub version: f32,
    /// Measurement-unit code (0 inches, 1 centimetres).
    pub units: f32,
    /// Words between the sentinel and the serial number, kept verbatim.
    pub extra: Vec<f32>,
}

impl Default for Trailer {
    fn default() -> Self {
        Self { serial: 0.0, version: 4.0, units: 0.0, extra: Vec::new() }
    }
}

impl Trailer {
    pub fn word_count(&self) -> usize {
        MIN_TRAILER + self.extra.len()
    }
}

/// File-level details needed to write a page back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinaryLayout {
    pub trailer: Trailer,
    /// The count prefix was four bytes wide.
    pub wide_count: bool,
}

struct Words<'a> {
    bytes: &'a [u8],
    prefix: usize,
}

impl Words<'_> {
    fn offset(&self, index: usize) -> usize {
        self.prefix + index * 4
    }

    fn get(&self, index: usize) -> f32 {
        let at = self.offset(index);
        f32::from_le_bytes([self.bytes[at], self.bytes[at + 1], self.bytes[at + 2], self.bytes[at + 3]])
    }

    fn slice(&self, start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| self.get(i)).collect()
    }
}

fn format_error(offset: usize, message: impl Into<String>) -> ScoreError {
    ScoreError::Format { offset, message: message.into() }
}

/// Field count or trailer length word decoded as a non-negative integer.
fn word_as_count(value: f32, offset: usize, what: &str) -> Result<usize, ScoreError> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(format_error(offset, format!("{} is {}, expected a whole number", what, value)));
    }
    Ok(value as usize)
}

/// Read a binary page into items (file order) and its layout.
pub fn read(bytes: &[u8]) -> Result<(Vec<Item>, BinaryLayout), ScoreError> {
    let (prefix, declared) = match bytes.len() % 4 {
        2 if bytes.len() >= 2 => (2, usize::from(u16::from_le_bytes([bytes[0], bytes[1]]))),
        0 if bytes.len() >= 4 => (4, u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize),
        _ => {
            return Err(format_error(
                bytes.len(),
                format!("length {} is not a count prefix plus whole words", bytes.len()),
            ))
        }
    };

    let count = (bytes.len() - prefix) / 4;
    if declared != count {
        return Err(format_error(0, format!("count prefix says {} words, file holds {}", declared, count)));
    }
    if count < MIN_TRAILER {
        return Err(format_error(prefix, format!("{} words is too short for a trailer", count)));
    }

    let words = Words { bytes, prefix };
    if words.get(count - 1) != TERMINATOR {
        return Err(format_error(words.offset(count - 1), "missing -9999.0 terminator"));
    }

    let trailer_len = word_as_count(words.get(count - 2), words.offset(count - 2), "trailer length")?;
    if trailer_len < MIN_TRAILER || trailer_len > count {
        return Err(format_error(
            words.offset(count - 2),
            format!("trailer length {} outside {}..={}", trailer_len, MIN_TRAILER, count),
        ));
    }
    let trailer_start = count - trailer_len;
    let sentinel = words.get(trailer_start);
    if sentinel != 0.0 {
        return Err(format_error(
            words.offset(trailer_start),
            format!("trailer sentinel is {}, expected 0", sentinel),
        ));
    }

    let trailer = Trailer {
        serial: words.get(count - 5),
        version: words.get(count - 4),
        units: words.get(count - 3),
        extra: words.slice(trailer_start + 1, trailer_len - MIN_TRAILER),
    };

    let mut items = Vec::new();
    let mut pos = 0;
    loop {
        let n_word = words.get(pos);
        if n_word == 0.0 {
            if pos != trailer_start {
                return Err(format_error(
                    words.offset(pos),
                    format!("item region ends at word {} but the trailer starts at word {}", pos, trailer_start),
                ));
            }
            break;
        }

        let n = word_as_count(n_word, words.offset(pos), "field count")?;
        if pos + 1 + n > trailer_start {
            return Err(format_error(
                words.offset(pos),
                format!("item of {} words runs into the trailer at word {}", n, trailer_start),
            ));
        }

        let item_type = ItemType::from_code(f64::from(words.get(pos + 1)));
        let item = if item_type.has_payload() {
            read_payload_item(&words, pos, n)?
        } else {
            if n > MAX_FIXED {
                return Err(format_error(
                    words.offset(pos),
                    format!("field count {} exceeds {}", n, MAX_FIXED),
                ));
            }
            Item::from_fixed(words.slice(pos + 1, n))?
        };
        items.push(item);
        pos += 1 + n;
    }

    Ok((items, BinaryLayout { trailer, wide_count: prefix == 4 }))
}

fn read_payload_item(words: &Words<'_>, pos: usize, n: usize) -> Result<Item, ScoreError> {
    if n < PAYLOAD_FIXED {
        return Err(format_error(
            words.offset(pos),
            format!("text item has {} words, needs at least {}", n, PAYLOAD_FIXED),
        ));
    }
    let fields = words.slice(pos + 1, PAYLOAD_FIXED);
    let length = word_as_count(fields[11], words.offset(pos + 12), "text length")?;
    let payload_words = length.div_ceil(4);
    if n != PAYLOAD_FIXED + payload_words {
        return Err(format_error(
            words.offset(pos),
            format!(
                "text item declares {} words but 13 fields plus {} bytes need {}",
                n,
                length,
                PAYLOAD_FIXED + payload_words
            ),
        ));
    }
    let start = words.offset(pos + 1 + PAYLOAD_FIXED);
    let text = latin1_decode(&words.bytes[start..start + length]);
    let mut item = Item::from_fixed(fields)?;
    item.set_text(&text);
    Ok(item)
}

/// Encode items and layout. The exact inverse of [`read`] for compacted input.
pub fn write(items: &[Item], layout: &BinaryLayout) -> Vec<u8> {
    let mut body: Vec<u8> = Vec::new();
    let push = |body: &mut Vec<u8>, value: f32| body.extend_from_slice(&value.to_le_bytes());

    for item in items {
        let mut fields = item.compacted_fixed(MIN_FIELDS);
        if item.item_type().has_payload() {
            let mut payload = latin1_encode(item.text().unwrap_or(""));
            fields[11] = payload.len() as f32;
            let padded = payload.len().div_ceil(4) * 4;
            payload.resize(padded, b' ');
            push(&mut body, (PAYLOAD_FIXED + padded / 4) as f32);
            for value in fields {
                push(&mut body, value);
            }
            body.extend_from_slice(&payload);
        } else {
            push(&mut body, fields.len() as f32);
            for value in fields {
                push(&mut body, value);
            }
        }
    }

    let trailer = &layout.trailer;
    push(&mut body, 0.0);
    for &value in &trailer.extra {
        push(&mut body, value);
    }
    push(&mut body, trailer.serial);
    push(&mut body, trailer.version);
    push(&mut body, trailer.units);
    push(&mut body, trailer.word_count() as f32);
    push(&mut body, TERMINATOR);

    let count = body.len() / 4;
    let mut out = Vec::with_capacity(body.len() + 4);
    match u16::try_from(count) {
        Ok(short) if !layout.wide_count => out.extend_from_slice(&short.to_le_bytes()),
        _ => out.extend_from_slice(&(count as u32).to_le_bytes()),
    }
    out.extend_from_slice(&body);
    out
}
