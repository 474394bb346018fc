use std::io::{self, Read};

use byteorder::ReadBytesExt;

const VALUE_MASK: u64 = 127; // 0111 1111
pub const CONTINUATION_MASK: u8 = 128; // 1000 0000

// 64 bits / 7 bits per byte, rounded up
const MAX_VAR_INT_LEN: usize = 10;

/// Appends `value` as a variable length integer.
///
/// Seven bits are stored per byte, least significant group first.
/// The *last* byte of the integer carries the continuation mask.
pub fn get_var_int_vec_u64(mut value: u64, output_buf: &mut Vec<u8>) {
    for _buf_idx in 0..MAX_VAR_INT_LEN {
        let last_seven_bits: u8 = (value & VALUE_MASK) as u8;
        value >>= 7;

        if value != 0 {
            output_buf.push(last_seven_bits);
        } else {
            output_buf.push(last_seven_bits | CONTINUATION_MASK);
            return;
        }
    }

    unreachable!("a u64 always fits in {} variable integer bytes", MAX_VAR_INT_LEN);
}

pub fn get_var_int_vec(value: u32, output_buf: &mut Vec<u8>) {
    get_var_int_vec_u64(value as u64, output_buf);
}

/// Zig-zag encodes `value` so small negative numbers stay short.
pub fn get_signed_var_int_vec(value: i64, output_buf: &mut Vec<u8>) {
    get_var_int_vec_u64(((value << 1) ^ (value >> 63)) as u64, output_buf);
}

/// Stores a non-negative float as an integer scaled by `precision`.
pub fn get_var_float_vec(value: f32, precision: f32, output_buf: &mut Vec<u8>) {
    debug_assert!(value >= 0.0 && value.is_finite());
    get_var_int_vec_u64((value as f64 * precision as f64).round() as u64, output_buf);
}

pub fn read_var_int_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut current_value: u64 = 0;
    let mut shift_amount: u32 = 0;

    for _ in 0..MAX_VAR_INT_LEN {
        let current_byte = reader.read_u8()?;
        current_value |= ((current_byte as u64) & VALUE_MASK) << shift_amount;

        if (CONTINUATION_MASK & current_byte) != 0 {
            return Ok(current_value);
        }
        shift_amount += 7;
    }

    Err(io::Error::new(io::ErrorKind::InvalidData, "variable integer longer than 10 bytes"))
}

pub fn read_var_int<R: Read>(reader: &mut R) -> io::Result<u32> {
    let value = read_var_int_u64(reader)?;
    if value > u32::MAX as u64 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "variable integer overflows 32 bits"));
    }

    Ok(value as u32)
}

pub fn read_signed_var_int<R: Read>(reader: &mut R) -> io::Result<i64> {
    let zig_zagged = read_var_int_u64(reader)?;
    Ok(((zig_zagged >> 1) as i64) ^ -((zig_zagged & 1) as i64))
}

pub fn read_var_float<R: Read>(reader: &mut R, precision: f32) -> io::Result<f32> {
    Ok((read_var_int_u64(reader)? as f64 / precision as f64) as f32)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut output_buf = Vec::new();
        get_var_int_vec_u64(value, &mut output_buf);
        output_buf
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(0), vec![CONTINUATION_MASK | 0]);

        assert_eq!(encode(64), vec![CONTINUATION_MASK | 64]);

        assert_eq!(encode(127), vec![CONTINUATION_MASK | 127]);

        assert_eq!(encode(16256), vec![0, CONTINUATION_MASK | 127]);

        assert_eq!(encode(16266), vec![10, CONTINUATION_MASK | 127]);

        assert_eq!(encode(16383), vec![127, CONTINUATION_MASK | 127]);

        assert_eq!(encode(u32::MAX as u64), vec![127, 127, 127, 127, CONTINUATION_MASK | 15]);

        assert_eq!(encode(u64::MAX).len(), 10);
    }

    #[test]
    fn test_decode() {
        assert_eq!(read_var_int_u64(&mut &[CONTINUATION_MASK | 0][..]).unwrap(), 0);

        assert_eq!(read_var_int_u64(&mut &[10, CONTINUATION_MASK | 127][..]).unwrap(), 16266);

        assert_eq!(
            read_var_int(&mut &[127, 127, 127, 127, CONTINUATION_MASK | 15][..]).unwrap(),
            u32::MAX,
        );

        assert_eq!(read_var_int_u64(&mut &encode(u64::MAX)[..]).unwrap(), u64::MAX);
    }

    #[test]
    fn test_decode_truncated() {
        let err = read_var_int_u64(&mut &[10, 127][..]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);

        let err = read_var_int_u64(&mut &[0; 11][..]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_signed() {
        for value in [0, 1, -1, 63, -64, i32::MAX as i64, i32::MIN as i64] {
            let mut buf = Vec::new();
            get_signed_var_int_vec(value, &mut buf);
            assert_eq!(read_signed_var_int(&mut &buf[..]).unwrap(), value);
        }

        let mut buf = Vec::new();
        get_signed_var_int_vec(-1, &mut buf);
        assert_eq!(buf, vec![CONTINUATION_MASK | 1]);
    }

    #[test]
    fn test_var_float_precision() {
        let mut buf = Vec::new();
        get_var_float_vec(0.30103, 1000.0, &mut buf);
        assert_eq!(read_var_float(&mut &buf[..], 1000.0).unwrap(), 0.301);
    }
}
