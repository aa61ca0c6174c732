use bytes::{Buf, BufMut};
use commonware_codec::{Error, ReadExt, Write};

/// Writes a string as a `u32` length prefix followed by its UTF-8 bytes.
pub fn write_string(s: &str, writer: &mut impl BufMut) {
    (s.len() as u32).write(writer);
    writer.put_slice(s.as_bytes());
}

/// Reads a length-prefixed UTF-8 string of at most `max_len` bytes.
pub fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("String", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

pub fn string_encode_size(s: &str) -> usize {
    std::mem::size_of::<u32>() + s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn string_survives_a_write_read_cycle() {
        let mut buf = BytesMut::new();
        write_string("Golden Claw", &mut buf);
        assert_eq!(buf.len(), string_encode_size("Golden Claw"));

        let mut reader = buf.as_ref();
        assert_eq!(read_string(&mut reader, 64).unwrap(), "Golden Claw");
        assert!(reader.is_empty());
    }

    #[test]
    fn read_string_rejects_oversized_prefix() {
        let mut buf = BytesMut::new();
        write_string("whack-a-mole", &mut buf);

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 4).expect_err("prefix exceeds limit");
        assert!(matches!(err, Error::Invalid("String", "too long")));
    }

    #[test]
    fn read_string_rejects_short_buffers() {
        let mut buf = BytesMut::new();
        (6u32).write(&mut buf);
        buf.extend_from_slice(b"gach");

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 16).expect_err("buffer is truncated");
        assert!(matches!(err, Error::EndOfBuffer));
    }

    #[test]
    fn read_string_rejects_invalid_utf8() {
        let mut buf = BytesMut::new();
        (2u32).write(&mut buf);
        buf.extend_from_slice(&[0xc3, 0x28]);

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 16).expect_err("not UTF-8");
        assert!(matches!(err, Error::Invalid("String", "invalid UTF-8")));
    }
}
