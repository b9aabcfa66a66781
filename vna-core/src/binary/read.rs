use byteorder::{ByteOrder, LittleEndian};
use vna_types::{VnaError, VnaResult};

fn take<'a>(
    buf: &'a [u8],
    off: &mut usize,
    n: usize,
) -> VnaResult<&'a [u8]> {
    let end = *off + n;
    if end > buf.len() {
        return Err(VnaError::record_decode(
            *off,
            format!("need {n} bytes, {} left", buf.len().saturating_sub(*off)),
        ));
    }
    let s = &buf[*off..end];
    *off = end;
    Ok(s)
}

pub fn read_i32_le(
    buf: &[u8],
    off: &mut usize,
) -> VnaResult<i32> {
    take(buf, off, 4).map(LittleEndian::read_i32)
}

pub fn read_u16_le(
    buf: &[u8],
    off: &mut usize,
) -> VnaResult<u16> {
    take(buf, off, 2).map(LittleEndian::read_u16)
}
