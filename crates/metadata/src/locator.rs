//! Recovery of base64 payloads embedded in source comments.
//!
//! Two placements are understood:
//!
//! - **Header**: a file whose name ends in a header suffix starts with `//` or
//!   `/*` followed directly by the payload.
//! - **Token**: somewhere in the buffer, `// <token>` or `/* <token>` is
//!   followed by the payload.
//!
//! A `//` payload is a single unbroken run ending at the line break. A `/* */`
//! payload may span lines; line breaks are dropped before decoding. Markers
//! are matched byte-wise as 7-bit ASCII.

use crate::config::MetadataConfig;
use crate::error::{MetadataError, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// Payloads ending in `=` must be padded out to a full quantum.
const PADDED_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Payloads without a trailing `=` carry no padding at all.
const UNPADDED_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

const LINE_MARKER: &[u8] = b"//";
const BLOCK_MARKER: &[u8] = b"/*";
const BLOCK_TERMINATOR: &[u8] = b"*/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    Line,
    Block,
}

/// How a buffer is expected to carry its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode<'a> {
    Header,
    Token(&'a str),
}

#[derive(Debug, Clone, Default)]
pub struct EncodedBlockLocator {
    config: MetadataConfig,
}

impl EncodedBlockLocator {
    pub fn new(config: MetadataConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    /// A non-empty search string selects token mode; otherwise a header
    /// filename selects header mode. `None` means the buffer is not expected
    /// to embed a block at all.
    pub fn mode<'a>(
        &'a self,
        raw_filename: &str,
        search_string: &'a str,
    ) -> Option<BlockMode<'a>> {
        let token = self.config.effective_search_string(search_string);
        if !token.is_empty() {
            Some(BlockMode::Token(token))
        } else if self.config.header_suffix(raw_filename).is_some() {
            Some(BlockMode::Header)
        } else {
            None
        }
    }

    /// Decoded payload for `buffer`, or `None` when the file does not carry
    /// one (including when it carries a malformed one).
    pub fn locate(
        &self,
        raw_filename: &str,
        buffer: &[u8],
        search_string: &str,
    ) -> Option<Vec<u8>> {
        let result = match self.mode(raw_filename, search_string)? {
            BlockMode::Header => Self::locate_header(buffer),
            BlockMode::Token(token) => Self::locate_token(buffer, token),
        };
        match result {
            Ok(payload) => {
                log::trace!("{raw_filename}: decoded {} payload bytes", payload.len());
                Some(payload)
            }
            Err(err) => {
                log::debug!("{raw_filename}: no embedded metadata: {err}");
                None
            }
        }
    }

    /// Decode a payload that directly follows a comment marker at offset 0.
    pub fn locate_header(buffer: &[u8]) -> Result<Vec<u8>> {
        let style = if buffer.starts_with(LINE_MARKER) {
            CommentStyle::Line
        } else if buffer.starts_with(BLOCK_MARKER) {
            CommentStyle::Block
        } else {
            return Err(MetadataError::MarkerNotFound);
        };
        decode_comment(buffer, LINE_MARKER.len(), style)
    }

    /// Decode the payload following the first `/* token`, or failing that
    /// the first `// token`.
    pub fn locate_token(buffer: &[u8], token: &str) -> Result<Vec<u8>> {
        if token.is_empty() {
            return Err(MetadataError::MarkerNotFound);
        }
        for (marker, style) in [
            (BLOCK_MARKER, CommentStyle::Block),
            (LINE_MARKER, CommentStyle::Line),
        ] {
            let mut needle = Vec::with_capacity(marker.len() + 1 + token.len());
            needle.extend_from_slice(marker);
            needle.push(b' ');
            needle.extend_from_slice(token.as_bytes());

            if let Some(pos) = find(buffer, &needle) {
                return decode_comment(buffer, pos + needle.len(), style);
            }
        }
        Err(MetadataError::MarkerNotFound)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_line_break(byte: u8) -> bool {
    matches!(byte, b'\n' | b'\r')
}

/// Collect the encoded text of a comment starting at `start` and decode it.
fn decode_comment(buffer: &[u8], start: usize, style: CommentStyle) -> Result<Vec<u8>> {
    let mut pos = start;
    while pos < buffer.len() && matches!(buffer[pos], b' ' | b'\t') {
        pos += 1;
    }
    let rest = &buffer[pos..];

    let encoded: Vec<u8> = match style {
        CommentStyle::Line => rest
            .iter()
            .copied()
            .take_while(|&byte| !is_line_break(byte))
            .collect(),
        CommentStyle::Block => {
            let end = find(rest, BLOCK_TERMINATOR).ok_or(MetadataError::UnterminatedBlock)?;
            rest[..end]
                .iter()
                .copied()
                .filter(|&byte| !is_line_break(byte))
                .collect()
        }
    };

    if encoded.is_empty() {
        return Err(MetadataError::EmptyPayload);
    }
    let decoded = if encoded.ends_with(b"=") {
        PADDED_ENGINE.decode(&encoded)?
    } else {
        UNPADDED_ENGINE.decode(&encoded)?
    };
    Ok(decoded)
}
