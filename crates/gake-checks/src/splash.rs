use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use gake_core::{GakeError, GakeResult};
use gake_modules_logging::{logmsg, Category, Priority};

/// Source of one unpredictable signed integer per draw.
pub trait EntropySource {
    fn draw_i64(&mut self) -> GakeResult<i64>;
}

/// Operating-system randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn draw_i64(&mut self) -> GakeResult<i64> {
        let mut bytes = [0u8; 8];
        getrandom::fill(&mut bytes).map_err(|e| GakeError::Entropy(e.to_string()))?;
        Ok(i64::from_ne_bytes(bytes))
    }
}

/// Always yields the same value. Makes splash selection reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedEntropy(pub i64);

impl EntropySource for FixedEntropy {
    #[inline]
    fn draw_i64(&mut self) -> GakeResult<i64> {
        Ok(self.0)
    }
}

/// `|entropy| mod lines`, or `None` for an empty pool.
#[inline]
pub fn splash_index(entropy: i64, lines: usize) -> Option<usize> {
    if lines == 0 {
        return None;
    }
    Some((entropy.unsigned_abs() % lines as u64) as usize)
}

/// Number of `\n`-terminated lines. A trailing fragment without newline does not count.
pub fn count_lines<R: BufRead>(mut reader: R) -> io::Result<usize> {
    let mut count = 0;
    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            return Ok(count);
        }
        count += chunk.iter().filter(|&&b| b == b'\n').count();
        let n = chunk.len();
        reader.consume(n);
    }
}

/// Line `index` (0-based) without its newline, or `None` if the reader ends first.
pub fn line_at<R: BufRead>(mut reader: R, index: usize) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    for _ in 0..=index {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
    }
    if line.last() != Some(&b'\n') {
        return Ok(None);
    }
    line.pop();
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Picks one line from the splash pool at `path`. Every failure yields `None`.
pub fn select_splash(path: &Path, entropy: &mut dyn EntropySource) -> Option<String> {
    match try_select_splash(path, entropy) {
        Ok(found) => found,
        Err(e) => {
            logmsg!(
                Priority::Debug,
                Category::Checks,
                "Splash selection from {} failed: {e}",
                path.display()
            );
            None
        }
    }
}

fn try_select_splash(path: &Path, entropy: &mut dyn EntropySource) -> GakeResult<Option<String>> {
    let file = File::open(path).map_err(|e| GakeError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let lines = count_lines(&mut reader).map_err(|e| GakeError::io(path, e))?;
    let Some(index) = splash_index(entropy.draw_i64()?, lines) else {
        return Ok(None);
    };

    reader
        .seek(SeekFrom::Start(0))
        .map_err(|e| GakeError::io(path, e))?;
    line_at(reader, index).map_err(|e| GakeError::io(path, e))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn index_is_absolute_value_modulo_count() {
        assert_eq!(splash_index(7, 5), Some(2));
        assert_eq!(splash_index(-7, 5), Some(2));
        assert_eq!(splash_index(0, 5), Some(0));
        assert_eq!(splash_index(i64::MIN, 3), Some((i64::MIN.unsigned_abs() % 3) as usize));
        assert_eq!(splash_index(i64::MAX, 1), Some(0));
        assert_eq!(splash_index(42, 0), None);
    }

    #[test]
    fn counts_only_terminated_lines() {
        assert_eq!(count_lines(Cursor::new(b"a\nb\nc\n")).unwrap(), 3);
        assert_eq!(count_lines(Cursor::new(b"a\nb\ntail")).unwrap(), 2);
        assert_eq!(count_lines(Cursor::new(b"")).unwrap(), 0);
    }

    #[test]
    fn line_at_strips_newline() {
        let text = b"first\nsecond\nthird\n";
        assert_eq!(line_at(Cursor::new(text), 1).unwrap().as_deref(), Some("second"));
        assert_eq!(line_at(Cursor::new(text), 3).unwrap(), None);
    }

    #[test]
    fn fixed_entropy_selects_expected_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("splashes.txt");
        fs::write(&path, "zero\none\ntwo\nthree\n").unwrap();

        for (e, expected) in [(0, "zero"), (5, "one"), (-6, "two"), (-1, "one"), (11, "three")] {
            let got = select_splash(&path, &mut FixedEntropy(e));
            assert_eq!(got.as_deref(), Some(expected), "entropy {e}");
        }

        // Restartable: the same draw against the same file gives the same line.
        let a = select_splash(&path, &mut FixedEntropy(-123_456_789));
        let b = select_splash(&path, &mut FixedEntropy(-123_456_789));
        assert_eq!(a, b);
    }

    #[test]
    fn empty_or_missing_pool_yields_none() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "").unwrap();

        assert_eq!(select_splash(&empty, &mut FixedEntropy(3)), None);
        assert_eq!(select_splash(&dir.path().join("missing.txt"), &mut FixedEntropy(3)), None);
    }

    #[test]
    fn os_entropy_draws() {
        OsEntropy.draw_i64().unwrap();
    }
}
