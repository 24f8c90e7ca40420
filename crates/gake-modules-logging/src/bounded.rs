use std::fmt;

/// Maximum size of a rendered message body, in bytes.
pub const MAX_MESSAGE_LEN: usize = 512;
/// Maximum size of a complete log line, newline included.
pub const MAX_LINE_LEN: usize = 1024;

/// `fmt::Write` target with a hard byte capacity.
///
/// Writes past the capacity are dropped silently; a character that would straddle the limit is
/// dropped whole so the buffer stays valid UTF-8. Once anything is dropped, every later write is
/// dropped too, so the result is always a prefix of the full rendering.
pub(crate) struct BoundedBuf {
    buf: String,
    cap: usize,
    truncated: bool,
}

impl BoundedBuf {
    #[inline]
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            buf: String::with_capacity(cap.min(MAX_LINE_LEN)),
            cap,
            truncated: false,
        }
    }

    #[inline]
    pub(crate) fn is_truncated(&self) -> bool {
        self.truncated
    }

    #[inline]
    pub(crate) fn into_string(self) -> String {
        self.buf
    }
}

impl fmt::Write for BoundedBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }
        let room = self.cap - self.buf.len();
        if s.len() <= room {
            self.buf.push_str(s);
            return Ok(());
        }

        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buf.push_str(&s[..cut]);
        self.truncated = true;
        Ok(())
    }
}

/// Renders `args` into at most `cap` bytes.
pub fn render_bounded(args: fmt::Arguments<'_>, cap: usize) -> String {
    let mut b = BoundedBuf::new(cap);
    let _ = fmt::write(&mut b, args);
    b.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn short_messages_pass_through() {
        assert_eq!(render_bounded(format_args!("a{}c", 'b'), 8), "abc");
    }

    #[test]
    fn long_messages_are_cut_at_capacity() {
        let long = "x".repeat(MAX_MESSAGE_LEN * 2);
        let out = render_bounded(format_args!("{long}"), MAX_MESSAGE_LEN);
        assert_eq!(out.len(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn cut_never_splits_a_character() {
        let mut b = BoundedBuf::new(4);
        b.write_str("abé").unwrap();
        b.write_str("é").unwrap();
        assert!(b.is_truncated());
        assert_eq!(b.into_string(), "abé");
    }

    #[test]
    fn nothing_is_appended_after_a_cut() {
        let out = render_bounded(format_args!("abc{}{}", 'é', "d"), 4);
        assert_eq!(out, "abc");

        let mut b = BoundedBuf::new(4);
        b.write_str("abc").unwrap();
        b.write_str("é").unwrap();
        b.write_str("d").unwrap();
        assert_eq!(b.into_string(), "abc");
    }
}
