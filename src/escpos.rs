//! ESC/POS encoding for render commands
//!
//! Maps each [`RenderCommand`] onto the byte sequence a generic ESC/POS
//! thermal printer understands.

use std::borrow::Cow;

use crate::layout::{Align, RenderCommand, TextStyle};

const ESC: u8 = 0x1B;
const FS: u8 = 0x1C;
const GS: u8 = 0x1D;
const LF: u8 = b'\n';

/// Initialize printer (ESC @). Clears styles left over from a previous job.
pub const INITIALIZE: [u8; 2] = [ESC, b'@'];

/// Enable Chinese character mode (FS &) and select the GBK code system
/// (FS C 1). ESC @ leaves Chinese mode, so this always follows INITIALIZE.
pub const SELECT_CHARSET: [u8; 5] = [FS, b'&', FS, b'C', 0x01];

/// Largest character multiplier GS ! accepts.
const MAX_MULTIPLIER: u8 = 8;

/// Encode a single command.
pub fn encode(command: &RenderCommand) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(command, &mut buf);
    buf
}

/// Bytes a device writes right after it is opened.
pub fn preamble() -> Vec<u8> {
    let mut buf = Vec::with_capacity(INITIALIZE.len() + SELECT_CHARSET.len());
    buf.extend_from_slice(&INITIALIZE);
    buf.extend_from_slice(&SELECT_CHARSET);
    buf
}

/// Encode a whole receipt, preceded by the preamble.
pub fn encode_all(commands: &[RenderCommand]) -> Vec<u8> {
    let mut buf = preamble();
    buf.reserve(64 * commands.len());
    for command in commands {
        encode_into(command, &mut buf);
    }
    buf
}

fn encode_into(command: &RenderCommand, buf: &mut Vec<u8>) {
    match command {
        RenderCommand::SetAlign { align } => {
            // ESC a n
            let n = match align {
                Align::Left => 0x00,
                Align::Center => 0x01,
                Align::Right => 0x02,
            };
            buf.extend_from_slice(&[ESC, b'a', n]);
        }
        RenderCommand::SetStyle { style } => {
            // ESC E n (emphasis), then ESC - n (underline)
            buf.extend_from_slice(&[ESC, b'E', u8::from(style.is_bold())]);
            buf.extend_from_slice(&[ESC, b'-', u8::from(style.is_underline())]);
        }
        RenderCommand::SetSize { width, height } => {
            // GS ! n - high nibble width, low nibble height
            buf.extend_from_slice(&[GS, b'!', size_byte(*width, *height)]);
        }
        RenderCommand::Text { text } => {
            buf.extend_from_slice(&encode_text(text));
            buf.push(LF);
        }
        RenderCommand::Feed { lines } => {
            // ESC d n - print and feed n lines
            buf.extend_from_slice(&[ESC, b'd', *lines]);
        }
        RenderCommand::Cut => {
            // GS V 0 - full cut
            buf.extend_from_slice(&[GS, b'V', 0x00]);
        }
    }
}

fn size_byte(width: u8, height: u8) -> u8 {
    let w = width.clamp(1, MAX_MULTIPLIER) - 1;
    let h = height.clamp(1, MAX_MULTIPLIER) - 1;
    (w << 4) | h
}

// GB18030 is a superset of GBK that maps every Unicode scalar, so nothing is
// replaced. ASCII passes through unchanged.
fn encode_text(text: &str) -> Cow<'_, [u8]> {
    let (bytes, _, _) = encoding_rs::GB18030.encode(text);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        assert_eq!(
            encode(&RenderCommand::align(Align::Center)),
            vec![0x1B, 0x61, 0x01]
        );
        assert_eq!(
            encode(&RenderCommand::align(Align::Right)),
            vec![0x1B, 0x61, 0x02]
        );
    }

    #[test]
    fn test_style() {
        assert_eq!(
            encode(&RenderCommand::style(TextStyle::BoldUnderline)),
            vec![0x1B, 0x45, 0x01, 0x1B, 0x2D, 0x01]
        );
        assert_eq!(
            encode(&RenderCommand::style(TextStyle::Normal)),
            vec![0x1B, 0x45, 0x00, 0x1B, 0x2D, 0x00]
        );
    }

    #[test]
    fn test_size() {
        assert_eq!(encode(&RenderCommand::size(2, 2)), vec![0x1D, 0x21, 0x11]);
        assert_eq!(encode(&RenderCommand::size(1, 2)), vec![0x1D, 0x21, 0x01]);
        assert_eq!(encode(&RenderCommand::size(1, 1)), vec![0x1D, 0x21, 0x00]);
        // Out-of-range multipliers are clamped
        assert_eq!(encode(&RenderCommand::size(0, 12)), vec![0x1D, 0x21, 0x07]);
    }

    #[test]
    fn test_text_is_line_terminated() {
        assert_eq!(encode(&RenderCommand::text("Rp 5")), b"Rp 5\n".to_vec());
    }

    #[test]
    fn test_text_uses_gbk_bytes() {
        assert_eq!(
            encode(&RenderCommand::text("Café")),
            vec![b'C', b'a', b'f', 0xA8, 0xA6, b'\n']
        );
        assert_eq!(
            encode(&RenderCommand::text("咖啡")),
            vec![0xBF, 0xA7, 0xB7, 0xC8, b'\n']
        );
    }

    #[test]
    fn test_feed_and_cut() {
        assert_eq!(encode(&RenderCommand::feed(3)), vec![0x1B, 0x64, 0x03]);
        assert_eq!(encode(&RenderCommand::Cut), vec![0x1D, 0x56, 0x00]);
    }

    #[test]
    fn test_encode_all_starts_with_initialize() {
        let bytes = encode_all(&[RenderCommand::text("A"), RenderCommand::Cut]);
        assert_eq!(
            bytes,
            vec![
                0x1B, 0x40, 0x1C, 0x26, 0x1C, 0x43, 0x01, b'A', b'\n', 0x1D, 0x56, 0x00
            ]
        );
    }
}
