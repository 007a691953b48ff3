//! Incremental byte-to-text decoding for chunked response bodies.
//!
//! HTTP chunk boundaries fall wherever the transport likes, including in the
//! middle of a multi-byte UTF-8 sequence. [`StreamDecoder`] carries the
//! incomplete tail of one chunk into the next so that concatenating its
//! outputs always reproduces the original text.

use crate::{Error, Result};

/// An incremental UTF-8 decoder.
///
/// Feed transport chunks to [`decode`](StreamDecoder::decode) as they
/// arrive and call [`finish`](StreamDecoder::finish) when the stream ends.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    carry: Vec<u8>,
}

impl StreamDecoder {
    /// Creates a new decoder with no buffered bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the next chunk, returning the longest valid prefix as text.
    ///
    /// An incomplete multi-byte sequence at the end of the chunk is held
    /// back for the next call. Bytes that can never form a valid sequence
    /// are an [`Error::Encoding`].
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String> {
        self.carry.extend_from_slice(chunk);
        match std::str::from_utf8(&self.carry) {
            Ok(text) => {
                let text = text.to_string();
                self.carry.clear();
                Ok(text)
            }
            Err(err) => {
                let valid = err.valid_up_to();
                if err.error_len().is_some() {
                    // Not a chunk-boundary artifact: the bytes are invalid.
                    self.carry.clear();
                    return Err(Error::encoding(
                        format!("invalid UTF-8 at byte offset {valid}"),
                        None,
                    ));
                }
                let text = String::from_utf8_lossy(&self.carry[..valid]).into_owned();
                self.carry.drain(..valid);
                Ok(text)
            }
        }
    }

    /// Flushes the decoder at end of stream.
    ///
    /// A dangling partial sequence means the stream was truncated mid-character.
    pub fn finish(&mut self) -> Result<String> {
        if self.carry.is_empty() {
            return Ok(String::new());
        }
        let dangling = self.carry.len();
        self.carry.clear();
        Err(Error::encoding(
            format!("stream ended with {dangling} undecodable trailing bytes"),
            None,
        ))
    }

    /// Returns the number of bytes held back awaiting continuation.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}
