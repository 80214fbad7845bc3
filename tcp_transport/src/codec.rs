//! Multipart frame codec
//!
//! A frame list travels as a big-endian `u32` frame count followed by each
//! frame as a big-endian `u32` length and its bytes.

use ipc::Frames;
use std::io::{self, Read, Write};

/// Largest accepted single frame
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Largest accepted number of frames in one list
pub const MAX_FRAMES: usize = 1024;

/// Writes one frame list
pub fn write_frames<W: Write>(writer: &mut W, frames: &[Vec<u8>]) -> io::Result<()> {
    let count = u32::try_from(frames.len())
        .ok()
        .filter(|count| *count as usize <= MAX_FRAMES)
        .ok_or_else(|| invalid(format!("too many frames: {}", frames.len())))?;

    let total: usize = frames.iter().map(|frame| 4 + frame.len()).sum();
    let mut buf = Vec::with_capacity(4 + total);
    buf.extend_from_slice(&count.to_be_bytes());
    for frame in frames {
        if frame.len() > MAX_FRAME_LEN {
            return Err(invalid(format!("frame too large: {} bytes", frame.len())));
        }
        buf.extend_from_slice(&(frame.len() as u32).to_be_bytes());
        buf.extend_from_slice(frame);
    }
    writer.write_all(&buf)?;
    writer.flush()
}

/// Reads one frame list
///
/// Returns `None` when the peer closed the connection between lists.
pub fn read_frames<R: Read>(reader: &mut R) -> io::Result<Option<Frames>> {
    let mut word = [0u8; 4];
    match reader.read_exact(&mut word) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }

    let count = u32::from_be_bytes(word) as usize;
    if count > MAX_FRAMES {
        return Err(invalid(format!("too many frames: {}", count)));
    }

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        reader.read_exact(&mut word)?;
        let len = u32::from_be_bytes(word) as usize;
        if len > MAX_FRAME_LEN {
            return Err(invalid(format!("frame too large: {} bytes", len)));
        }
        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame)?;
        frames.push(frame);
    }
    Ok(Some(frames))
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_layout_is_big_endian() {
        let mut out = Vec::new();
        write_frames(&mut out, &[b"ab".to_vec(), Vec::new()]).unwrap();
        assert_eq!(
            out,
            vec![0, 0, 0, 2, 0, 0, 0, 2, b'a', b'b', 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_reads_consecutive_lists() {
        let mut out = Vec::new();
        write_frames(&mut out, &[b"one".to_vec()]).unwrap();
        write_frames(&mut out, &[b"two".to_vec(), b"three".to_vec()]).unwrap();

        let mut cursor = Cursor::new(out);
        assert_eq!(read_frames(&mut cursor).unwrap(), Some(vec![b"one".to_vec()]));
        assert_eq!(
            read_frames(&mut cursor).unwrap(),
            Some(vec![b"two".to_vec(), b"three".to_vec()])
        );
        assert_eq!(read_frames(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_truncated_list_is_an_error() {
        let mut out = Vec::new();
        write_frames(&mut out, &[b"payload".to_vec()]).unwrap();
        out.truncate(out.len() - 2);
        let err = read_frames(&mut Cursor::new(out)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_oversized_count_is_rejected() {
        let bytes = (MAX_FRAMES as u32 + 1).to_be_bytes().to_vec();
        let err = read_frames(&mut Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
