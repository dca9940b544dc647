//! Endian-aware byte access
//!
//! Every multi-byte field in a container follows the byte order declared by
//! its header. [`Reader`] walks a buffer forwards; the `put_*` helpers write
//! single fields in place without changing the buffer length.

use crate::error::{FontError, Result};

/// Byte order declared by a container's BOM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    #[inline]
    pub fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(bytes),
            ByteOrder::Big => u16::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    #[inline]
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }
}

/// Forward reader over a byte slice
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    /// Reader positioned at `pos`
    pub fn at(data: &'a [u8], pos: usize, order: ByteOrder) -> Self {
        Self { data, pos, order }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = read_array(self.data, self.pos)?;
        self.pos += N;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take::<1>()?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take()?;
        Ok(self.order.u16_from(bytes))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take()?;
        Ok(self.order.u32_from(bytes))
    }

    /// Read a four-byte section tag
    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        self.take()
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    let end = offset
        .checked_add(N)
        .filter(|&end| end <= data.len())
        .ok_or(FontError::OutOfBounds { offset, size: N })?;
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&data[offset..end]);
    Ok(bytes)
}

fn write_slice(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<()> {
    let end = offset
        .checked_add(bytes.len())
        .filter(|&end| end <= buf.len())
        .ok_or(FontError::OutOfBounds {
            offset,
            size: bytes.len(),
        })?;
    buf[offset..end].copy_from_slice(bytes);
    Ok(())
}

pub fn get_u8(data: &[u8], offset: usize) -> Result<u8> {
    Ok(read_array::<1>(data, offset)?[0])
}

pub fn get_u16(data: &[u8], offset: usize, order: ByteOrder) -> Result<u16> {
    Ok(order.u16_from(read_array(data, offset)?))
}

pub fn get_i16(data: &[u8], offset: usize, order: ByteOrder) -> Result<i16> {
    Ok(get_u16(data, offset, order)? as i16)
}

pub fn get_u32(data: &[u8], offset: usize, order: ByteOrder) -> Result<u32> {
    Ok(order.u32_from(read_array(data, offset)?))
}

pub fn put_u8(buf: &mut [u8], offset: usize, value: u8) -> Result<()> {
    write_slice(buf, offset, &[value])
}

pub fn put_u16(buf: &mut [u8], offset: usize, value: u16, order: ByteOrder) -> Result<()> {
    write_slice(buf, offset, &order.u16_bytes(value))
}

pub fn put_i16(buf: &mut [u8], offset: usize, value: i16, order: ByteOrder) -> Result<()> {
    put_u16(buf, offset, value as u16, order)
}

pub fn put_u32(buf: &mut [u8], offset: usize, value: u32, order: ByteOrder) -> Result<()> {
    write_slice(buf, offset, &order.u32_bytes(value))
}
