const ESC: u8 = 0x1b;
const TERMINATOR: u8 = b'm';

/// Blanks every SGR escape sequence in `buf` with spaces, introducer and terminating `m` included.
///
/// The scan never leaves `buf`: an introducer without a terminator blanks the rest of the buffer.
/// Every replaced byte becomes an ASCII space, so valid UTF-8 stays valid UTF-8.
pub fn strip_escapes(buf: &mut [u8]) {
    let mut i = 0;
    while i < buf.len() {
        if buf[i] != ESC {
            i += 1;
            continue;
        }

        let end = buf[i..]
            .iter()
            .position(|&b| b == TERMINATOR)
            .map(|off| i + off + 1)
            .unwrap_or(buf.len());

        buf[i..end].fill(b' ');
        i = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(s: &str) -> String {
        let mut b = s.as_bytes().to_vec();
        strip_escapes(&mut b);
        String::from_utf8(b).unwrap()
    }

    #[test]
    fn color_and_reset_become_spaces() {
        assert_eq!(strip("\x1b[31mERROR\x1b[m"), "     ERROR   ");
    }

    #[test]
    fn truecolor_sequence_is_blanked_whole() {
        let s = "\x1b[38;2;255;255;128mhi\x1b[m";
        let out = strip(s);
        assert_eq!(out.len(), s.len());
        assert_eq!(out.trim(), "hi");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(strip("[12:00:00] nothing to see"), "[12:00:00] nothing to see");
    }

    #[test]
    fn unterminated_sequence_stops_at_buffer_end() {
        assert_eq!(strip("ok \x1b[1;3"), "ok      ");
    }

    #[test]
    fn multibyte_text_inside_escape_stays_valid_utf8() {
        let out = strip("a\x1b[é m b");
        assert_eq!(out, "a       b");
    }
}
