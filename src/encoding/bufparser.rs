use crate::encoding::parseerror::ParseError;
use crate::encoding::varint::{decode_u32, decode_u64, decode_usize};

/// A zero-copy parse cursor over a byte buffer. Every read is bounds checked;
/// running off the end is [`ParseError::UnexpectedEOF`], never a panic.
#[derive(Debug, Clone)]
pub(crate) struct BufParser<'a>(pub(crate) &'a [u8]);

impl<'a> BufParser<'a> {
    #[inline]
    fn check_not_empty(&self) -> Result<(), ParseError> {
        if self.0.is_empty() {
            Err(ParseError::UnexpectedEOF)
        } else {
            Ok(())
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn expect_empty(&self) -> Result<(), ParseError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ParseError::InvalidLength)
        }
    }

    fn consume(&mut self, num: usize) {
        self.0 = &self.0[num..];
    }

    #[allow(unused)]
    pub(crate) fn next_u32(&mut self) -> Result<u32, ParseError> {
        self.check_not_empty()?;
        let (val, count) = decode_u32(self.0)?;
        self.consume(count);
        Ok(val)
    }

    pub(crate) fn next_u64(&mut self) -> Result<u64, ParseError> {
        self.check_not_empty()?;
        let (val, count) = decode_u64(self.0)?;
        self.consume(count);
        Ok(val)
    }

    pub(crate) fn next_usize(&mut self) -> Result<usize, ParseError> {
        self.check_not_empty()?;
        let (val, count) = decode_usize(self.0)?;
        self.consume(count);
        Ok(val)
    }

    pub(crate) fn next_u32_le(&mut self) -> Result<u32, ParseError> {
        let bytes = self.next_n_bytes(4)?;
        let bytes = bytes.try_into().map_err(|_| ParseError::UnexpectedEOF)?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub(crate) fn next_n_bytes(&mut self, num_bytes: usize) -> Result<&'a [u8], ParseError> {
        if num_bytes > self.0.len() {
            return Err(ParseError::UnexpectedEOF);
        }
        let (data, remainder) = self.0.split_at(num_bytes);
        self.0 = remainder;
        Ok(data)
    }

    // Note the result borrows from the underlying buffer ('a), not from self.
    pub(crate) fn next_str(&mut self) -> Result<&'a str, ParseError> {
        let len = self.next_usize()?;
        if len > self.0.len() {
            return Err(ParseError::InvalidLength);
        }
        let bytes = self.next_n_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUTF8)
    }
}
