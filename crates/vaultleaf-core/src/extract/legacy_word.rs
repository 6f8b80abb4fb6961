//! Word 97-2003 (`.doc`) text.
//!
//! The document lives in an OLE compound file. The main text is described by
//! the piece table (CLX) in the table stream; each piece is either 8-bit
//! Windows-1252 or UTF-16LE text inside the `WordDocument` stream. Only the
//! main document story (`ccpText` characters) is returned.

use super::{DocumentFormat, TextExtractor};
use crate::error::{Result, VaultError};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const WORD_IDENT: u16 = 0xA5EC;
const FIB_FLAGS_OFFSET: usize = 0x0A;
const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_WHICH_TABLE: u16 = 0x0200;
const FIB_BASE_LEN: usize = 32;
const CCP_TEXT_INDEX: usize = 3;
const CLX_PAIR_INDEX: usize = 33;
const FC_COMPRESSED: u32 = 0x4000_0000;

pub struct LegacyWordExtractor;

impl TextExtractor for LegacyWordExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let mut compound = cfb::open(path).map_err(|err| malformed(err.to_string()))?;
        let word = read_stream(&mut compound, "/WordDocument")?;
        let fib = Fib::parse(&word)?;
        if fib.encrypted {
            return Err(malformed("document is encrypted"));
        }
        let table_name = if fib.which_table { "/1Table" } else { "/0Table" };
        let table = read_stream(&mut compound, table_name)?;
        let clx = table
            .get(fib.fc_clx..fib.fc_clx + fib.lcb_clx)
            .ok_or_else(|| malformed("piece table lies outside the table stream"))?;
        let pieces = parse_clx(clx)?;
        debug!(
            path = %path.display(),
            pieces = pieces.len(),
            ccp_text = fib.ccp_text,
            "Parsed Word 97 piece table"
        );

        let mut raw = String::new();
        let mut remaining = fib.ccp_text;
        for piece in pieces {
            if remaining == 0 {
                break;
            }
            let count = piece.char_count.min(remaining);
            piece.decode_into(&word, count, &mut raw)?;
            remaining -= count;
        }
        Ok(clean_control_chars(&raw).trim_end().to_string())
    }
}

fn malformed(message: impl Into<String>) -> VaultError {
    VaultError::parse(DocumentFormat::LegacyWord, message)
}

fn read_stream(compound: &mut cfb::CompoundFile<File>, name: &str) -> Result<Vec<u8>> {
    let mut stream = compound
        .open_stream(name)
        .map_err(|err| malformed(format!("missing {name} stream: {err}")))?;
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .map_err(|err| VaultError::io(format!("reading {name} stream"), err))?;
    Ok(bytes)
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| malformed(format!("truncated at byte {offset}")))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| malformed(format!("truncated at byte {offset}")))
}

/// The handful of File Information Block fields the text needs.
#[derive(Debug)]
struct Fib {
    encrypted: bool,
    which_table: bool,
    ccp_text: usize,
    fc_clx: usize,
    lcb_clx: usize,
}

impl Fib {
    fn parse(word: &[u8]) -> Result<Self> {
        if read_u16(word, 0)? != WORD_IDENT {
            return Err(malformed("not a Word 97-2003 document"));
        }
        let flags = read_u16(word, FIB_FLAGS_OFFSET)?;

        let csw = read_u16(word, FIB_BASE_LEN)? as usize;
        let cslw_offset = FIB_BASE_LEN + 2 + csw * 2;
        let cslw = read_u16(word, cslw_offset)? as usize;
        let rg_lw = cslw_offset + 2;
        let ccp_text = read_u32(word, rg_lw + CCP_TEXT_INDEX * 4)? as usize;

        let cb_offset = rg_lw + cslw * 4;
        let pair_count = read_u16(word, cb_offset)? as usize;
        if pair_count <= CLX_PAIR_INDEX {
            return Err(malformed("file information block has no piece table entry"));
        }
        let clx_pair = cb_offset + 2 + CLX_PAIR_INDEX * 8;
        Ok(Self {
            encrypted: flags & FLAG_ENCRYPTED != 0,
            which_table: flags & FLAG_WHICH_TABLE != 0,
            ccp_text,
            fc_clx: read_u32(word, clx_pair)? as usize,
            lcb_clx: read_u32(word, clx_pair + 4)? as usize,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    char_count: usize,
    offset: usize,
    compressed: bool,
}

impl Piece {
    fn decode_into(&self, word: &[u8], count: usize, out: &mut String) -> Result<()> {
        if self.compressed {
            let bytes = word
                .get(self.offset..self.offset + count)
                .ok_or_else(|| malformed("text piece lies outside the document stream"))?;
            out.extend(bytes.iter().map(|&b| windows_1252(b)));
        } else {
            let bytes = word
                .get(self.offset..self.offset + count * 2)
                .ok_or_else(|| malformed("text piece lies outside the document stream"))?;
            let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
            out.extend(char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));
        }
        Ok(())
    }
}

fn parse_clx(clx: &[u8]) -> Result<Vec<Piece>> {
    let mut pos = 0;
    while pos < clx.len() {
        match clx[pos] {
            // Prc: property modifiers, skipped.
            0x01 => {
                let size = read_u16(clx, pos + 1)? as usize;
                pos += 3 + size;
            }
            0x02 => {
                let size = read_u32(clx, pos + 1)? as usize;
                let plc = clx
                    .get(pos + 5..pos + 5 + size)
                    .ok_or_else(|| malformed("piece table is truncated"))?;
                return parse_plc_pcd(plc);
            }
            other => return Err(malformed(format!("unexpected CLX entry 0x{other:02x}"))),
        }
    }
    Err(malformed("document has no piece table"))
}

fn parse_plc_pcd(plc: &[u8]) -> Result<Vec<Piece>> {
    if plc.len() < 4 || (plc.len() - 4) % 12 != 0 {
        return Err(malformed("piece table has an invalid size"));
    }
    let count = (plc.len() - 4) / 12;
    let descriptors = (count + 1) * 4;
    let mut pieces = Vec::with_capacity(count);
    for i in 0..count {
        let start = read_u32(plc, i * 4)? as usize;
        let end = read_u32(plc, (i + 1) * 4)? as usize;
        let fc = read_u32(plc, descriptors + i * 8 + 2)?;
        let compressed = fc & FC_COMPRESSED != 0;
        let raw = (fc & !FC_COMPRESSED) as usize;
        pieces.push(Piece {
            char_count: end.saturating_sub(start),
            offset: if compressed { raw / 2 } else { raw },
            compressed,
        });
    }
    Ok(pieces)
}

fn windows_1252(byte: u8) -> char {
    match byte {
        0x80 => '€',
        0x85 => '…',
        0x91 => '‘',
        0x92 => '’',
        0x93 => '“',
        0x94 => '”',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0x99 => '™',
        other => other as char,
    }
}

/// Map Word's in-band control characters to plain whitespace and drop field
/// instructions, keeping only field results.
fn clean_control_chars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    // One entry per open field: true while still inside its instruction part.
    let mut fields: Vec<bool> = Vec::new();
    for ch in raw.chars() {
        match ch {
            '\u{13}' => fields.push(true),
            '\u{14}' => {
                if let Some(in_code) = fields.last_mut() {
                    *in_code = false;
                }
            }
            '\u{15}' => {
                fields.pop();
            }
            _ if fields.iter().any(|in_code| *in_code) => {}
            '\r' | '\u{0B}' | '\u{0C}' => out.push('\n'),
            '\u{07}' => out.push('\t'),
            '\u{1E}' => out.push('-'),
            '\t' | '\n' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEXT_OFFSET: usize = 0x400;

    /// Minimal Word 97 file: FIB, one compressed piece, table stream `1Table`.
    fn write_doc(path: &Path, body: &str, main_len: usize) {
        let text: Vec<u8> = body.bytes().collect();
        let mut word = vec![0u8; TEXT_OFFSET + text.len()];
        word[0..2].copy_from_slice(&WORD_IDENT.to_le_bytes());
        word[FIB_FLAGS_OFFSET..FIB_FLAGS_OFFSET + 2].copy_from_slice(&FLAG_WHICH_TABLE.to_le_bytes());

        let csw = 14usize;
        word[32..34].copy_from_slice(&(csw as u16).to_le_bytes());
        let cslw_offset = 34 + csw * 2;
        let cslw = 22usize;
        word[cslw_offset..cslw_offset + 2].copy_from_slice(&(cslw as u16).to_le_bytes());
        let rg_lw = cslw_offset + 2;
        let ccp = rg_lw + CCP_TEXT_INDEX * 4;
        word[ccp..ccp + 4].copy_from_slice(&(main_len as u32).to_le_bytes());
        let cb_offset = rg_lw + cslw * 4;
        word[cb_offset..cb_offset + 2].copy_from_slice(&93u16.to_le_bytes());

        let mut plc = Vec::new();
        plc.extend_from_slice(&0u32.to_le_bytes());
        plc.extend_from_slice(&(text.len() as u32).to_le_bytes());
        plc.extend_from_slice(&0u16.to_le_bytes());
        plc.extend_from_slice(&(((TEXT_OFFSET * 2) as u32) | FC_COMPRESSED).to_le_bytes());
        plc.extend_from_slice(&0u16.to_le_bytes());
        let mut table = vec![0u8; 16];
        let fc_clx = table.len();
        table.push(0x02);
        table.extend_from_slice(&(plc.len() as u32).to_le_bytes());
        table.extend_from_slice(&plc);
        let lcb_clx = table.len() - fc_clx;

        let pair = cb_offset + 2 + CLX_PAIR_INDEX * 8;
        word[pair..pair + 4].copy_from_slice(&(fc_clx as u32).to_le_bytes());
        word[pair + 4..pair + 8].copy_from_slice(&(lcb_clx as u32).to_le_bytes());
        word[TEXT_OFFSET..].copy_from_slice(&text);

        let mut compound = cfb::create(path).expect("create compound file");
        compound
            .create_stream("/WordDocument")
            .expect("word stream")
            .write_all(&word)
            .expect("write word stream");
        compound
            .create_stream("/1Table")
            .expect("table stream")
            .write_all(&table)
            .expect("write table stream");
        compound.flush().expect("flush");
    }

    #[test]
    fn reads_main_story_and_drops_field_codes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memo.doc");
        let main = "Hello\rPage \u{13} PAGE \u{14}1\u{15}\r";
        let body = format!("{main}Footnote text\r");
        write_doc(&path, &body, main.len());

        let text = LegacyWordExtractor.extract(&path).expect("extract");
        assert_eq!(text, "Hello\nPage 1");
    }

    #[test]
    fn docx_bytes_with_doc_extension_fail_cleanly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("renamed.doc");
        std::fs::write(&path, b"PK\x03\x04 not a compound file").expect("write");
        assert!(matches!(
            LegacyWordExtractor.extract(&path),
            Err(VaultError::Parse {
                format: DocumentFormat::LegacyWord,
                ..
            })
        ));
    }

    #[test]
    fn nested_fields_keep_only_results() {
        let raw = "a\u{13}X\u{13}Y\u{14}y\u{15}\u{14}x\u{15}b\u{07}c";
        assert_eq!(clean_control_chars(raw), "axb\tc");
    }
}
