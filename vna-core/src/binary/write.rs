use byteorder::{ByteOrder, LittleEndian};

/// u64 → 8 байт, младший первым (формат регистров частоты).
pub fn write_u64_le(val: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, val);
    buf
}

/// u16 → 2 байта, младший первым.
pub fn write_u16_le(val: u16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    LittleEndian::write_u16(&mut buf, val);
    buf
}

pub fn write_i32_le(
    buf: &mut [u8],
    off: &mut usize,
    val: i32,
) {
    LittleEndian::write_i32(&mut buf[*off..*off + 4], val);
    *off += 4;
}
