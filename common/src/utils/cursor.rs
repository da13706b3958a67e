use crate::error::CursorError;
use byteorder::{BigEndian, ByteOrder};

/// Big-endian reader over a borrowed byte slice.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], CursorError> {
        if self.remaining() < len {
            return Err(CursorError::UnexpectedEof {
                position: self.pos,
                wanted: len - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.bytes(1)?[0])
    }

    pub fn i8(&mut self) -> Result<i8, CursorError> {
        Ok(self.u8()? as i8)
    }

    pub fn u16(&mut self) -> Result<u16, CursorError> {
        Ok(BigEndian::read_u16(self.bytes(2)?))
    }

    pub fn i16(&mut self) -> Result<i16, CursorError> {
        Ok(BigEndian::read_i16(self.bytes(2)?))
    }

    pub fn u32(&mut self) -> Result<u32, CursorError> {
        Ok(BigEndian::read_u32(self.bytes(4)?))
    }

    pub fn i32(&mut self) -> Result<i32, CursorError> {
        Ok(BigEndian::read_i32(self.bytes(4)?))
    }

    pub fn i64(&mut self) -> Result<i64, CursorError> {
        Ok(BigEndian::read_i64(self.bytes(8)?))
    }

    pub fn f32(&mut self) -> Result<f32, CursorError> {
        Ok(BigEndian::read_f32(self.bytes(4)?))
    }

    pub fn f64(&mut self) -> Result<f64, CursorError> {
        Ok(BigEndian::read_f64(self.bytes(8)?))
    }

    /// Reads a `u16` length followed by that many bytes.
    pub fn u16_prefixed(&mut self) -> Result<&'a [u8], CursorError> {
        let len = self.u16()? as usize;
        self.bytes(len)
    }

    /// Reads a `u32` length followed by that many bytes.
    pub fn u32_prefixed(&mut self) -> Result<&'a [u8], CursorError> {
        let len = self.u32()? as usize;
        self.bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_values() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0xFF, 0x00, 0x02, 0x41, 0x42];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.u32().unwrap(), 0xCAFEBABE);
        assert_eq!(cursor.u16().unwrap(), 52);
        assert_eq!(cursor.i8().unwrap(), -1);
        assert_eq!(cursor.u16_prefixed().unwrap(), b"AB");
        assert!(cursor.is_empty());
    }

    #[test]
    fn reports_eof_with_position() {
        let data = [0x00, 0x01];
        let mut cursor = ByteCursor::new(&data);
        cursor.u8().unwrap();
        assert_eq!(
            cursor.u32(),
            Err(CursorError::UnexpectedEof {
                position: 1,
                wanted: 3
            })
        );
        assert_eq!(cursor.remaining(), 1);
    }
}
