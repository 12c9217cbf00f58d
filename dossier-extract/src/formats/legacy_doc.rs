//! Body text of Word 97-2003 binary documents.
//!
//! The text lives in the `WordDocument` stream, scattered across pieces described by
//! the piece table (`Clx`) in the `0Table`/`1Table` stream. Only the main document
//! story (the first `ccpText` characters) is returned; headers, footnotes and
//! comments that follow it in character-position space are dropped.

use super::run_blocking;
use crate::error::{ExtractError, Result};
use crate::extractor::Extractor;
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;

const WORD_IDENT: u16 = 0xA5EC;
const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_TABLE_ONE: u16 = 0x0200;

const OFFSET_FLAGS: usize = 0x000A;
const OFFSET_CCP_TEXT: usize = 0x004C;
const OFFSET_FC_CLX: usize = 0x01A2;
const OFFSET_LCB_CLX: usize = 0x01A6;

const CLX_PRC: u8 = 0x01;
const CLX_PCDT: u8 = 0x02;
const PCD_SIZE: usize = 8;
const FC_COMPRESSED: u32 = 0x4000_0000;

const FIELD_BEGIN: char = '\u{13}';
const FIELD_SEPARATOR: char = '\u{14}';
const FIELD_END: char = '\u{15}';

const PIECE_OUT_OF_BOUNDS: &str = "piece points past the end of the stream";

/// Code points for bytes 0x80..=0x9F in Windows-1252; the rest of the range maps
/// straight onto Latin-1.
const CP1252_HIGH: [char; 32] = [
    '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8D}', 'Ž', '\u{8F}',
    '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9D}', 'ž', 'Ÿ',
];

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyDocExtractor;

#[async_trait]
impl Extractor for LegacyDocExtractor {
    async fn extract(&self, path: &Path) -> Result<Option<String>> {
        let path = path.to_path_buf();
        let text = run_blocking(move || read_doc(&path)).await?;
        Ok(Some(text))
    }

    fn name(&self) -> &str {
        "word-binary"
    }
}

fn read_doc(path: &Path) -> Result<String> {
    let mut compound = cfb::open(path)?;
    let word = read_stream(&mut compound, "/WordDocument")?;
    let fib = Fib::parse(&word)?;

    let table_name = if fib.table_one { "/1Table" } else { "/0Table" };
    let table = read_stream(&mut compound, table_name)?;

    let clx_end = fib.fc_clx + fib.lcb_clx;
    let clx = table
        .get(fib.fc_clx..clx_end)
        .ok_or_else(|| ExtractError::legacy_doc("piece table lies outside the table stream"))?;

    let pieces = parse_clx(clx)?;
    let raw = collect_text(&word, &pieces, fib.ccp_text)?;
    Ok(clean_body(&raw))
}

fn read_stream(compound: &mut cfb::CompoundFile<std::fs::File>, name: &str) -> Result<Vec<u8>> {
    let mut stream = compound
        .open_stream(name)
        .map_err(|e| ExtractError::legacy_doc(format!("missing {name} stream: {e}")))?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

/// The handful of File Information Block fields needed to find the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fib {
    table_one: bool,
    ccp_text: usize,
    fc_clx: usize,
    lcb_clx: usize,
}

impl Fib {
    fn parse(word: &[u8]) -> Result<Self> {
        if read_u16(word, 0)? != WORD_IDENT {
            return Err(ExtractError::legacy_doc("not a Word binary document"));
        }

        let flags = read_u16(word, OFFSET_FLAGS)?;
        if flags & FLAG_ENCRYPTED != 0 {
            return Err(ExtractError::legacy_doc("document is encrypted"));
        }

        Ok(Self {
            table_one: flags & FLAG_TABLE_ONE != 0,
            ccp_text: read_u32(word, OFFSET_CCP_TEXT)? as usize,
            fc_clx: read_u32(word, OFFSET_FC_CLX)? as usize,
            lcb_clx: read_u32(word, OFFSET_LCB_CLX)? as usize,
        })
    }
}

/// One run of text: character positions `[cp_start, cp_end)` stored at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    cp_start: usize,
    cp_end: usize,
    offset: usize,
    compressed: bool,
}

fn parse_clx(clx: &[u8]) -> Result<Vec<Piece>> {
    let mut pos = 0;
    while pos < clx.len() {
        match clx[pos] {
            CLX_PRC => {
                let cb = read_u16(clx, pos + 1)? as usize;
                pos += 3 + cb;
            }
            CLX_PCDT => {
                let lcb = read_u32(clx, pos + 1)? as usize;
                let plc = clx
                    .get(pos + 5..pos + 5 + lcb)
                    .ok_or_else(|| ExtractError::legacy_doc("truncated piece table"))?;
                return parse_plc_pcd(plc);
            }
            other => {
                return Err(ExtractError::legacy_doc(format!(
                    "unexpected Clx entry type {other:#04x}"
                )));
            }
        }
    }
    Err(ExtractError::legacy_doc("piece table has no Pcdt entry"))
}

fn parse_plc_pcd(plc: &[u8]) -> Result<Vec<Piece>> {
    if plc.len() < 4 {
        return Err(ExtractError::legacy_doc("empty piece table"));
    }
    let count = (plc.len() - 4) / (4 + PCD_SIZE);
    let descriptors = 4 * (count + 1);

    (0..count)
        .map(|i| {
            let fc = read_u32(plc, descriptors + i * PCD_SIZE + 2)?;
            let compressed = fc & FC_COMPRESSED != 0;
            let fc = (fc & !FC_COMPRESSED) as usize;
            Ok(Piece {
                cp_start: read_u32(plc, 4 * i)? as usize,
                cp_end: read_u32(plc, 4 * (i + 1))? as usize,
                offset: if compressed { fc / 2 } else { fc },
                compressed,
            })
        })
        .collect()
}

/// Decode the first `ccp_text` characters of the document from its pieces.
fn collect_text(word: &[u8], pieces: &[Piece], ccp_text: usize) -> Result<String> {
    let mut text = String::new();

    for piece in pieces {
        if piece.cp_start >= ccp_text {
            break;
        }
        let chars = piece.cp_end.min(ccp_text).saturating_sub(piece.cp_start);

        if piece.compressed {
            let bytes = word
                .get(piece.offset..piece.offset + chars)
                .ok_or_else(|| ExtractError::legacy_doc(PIECE_OUT_OF_BOUNDS))?;
            text.extend(bytes.iter().map(|&b| decode_cp1252(b)));
        } else {
            let bytes = word
                .get(piece.offset..piece.offset + 2 * chars)
                .ok_or_else(|| ExtractError::legacy_doc(PIECE_OUT_OF_BOUNDS))?;
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            text.extend(
                char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
            );
        }
    }

    Ok(text)
}

fn decode_cp1252(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

/// Turn Word's control characters into plain text. Field instructions (between
/// begin and separator marks) are dropped; field results are kept.
fn clean_body(raw: &str) -> String {
    // one entry per open field: true while still inside its instruction part
    let mut fields: Vec<bool> = Vec::new();
    let mut text = String::with_capacity(raw.len());

    for c in raw.chars() {
        match c {
            FIELD_BEGIN => fields.push(true),
            FIELD_SEPARATOR => {
                if let Some(in_code) = fields.last_mut() {
                    *in_code = false;
                }
            }
            FIELD_END => {
                fields.pop();
            }
            _ if fields.iter().any(|&in_code| in_code) => {}
            '\r' | '\u{0B}' | '\u{0C}' => text.push('\n'),
            '\u{07}' => text.push('\t'),
            '\u{1E}' => text.push('-'),
            '\t' | '\n' => text.push(c),
            c if (c as u32) < 0x20 => {}
            c => text.push(c),
        }
    }

    text.trim_end().to_string()
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| ExtractError::legacy_doc(format!("truncated at offset {offset:#x}")))
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| ExtractError::legacy_doc(format!("truncated at offset {offset:#x}")))
}
