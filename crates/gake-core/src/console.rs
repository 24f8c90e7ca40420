use std::io::{self, Write};

/// Unbuffered stderr that never takes the std `Stderr` lock.
///
/// That lock is reentrant and owned by a thread: a thread stopped inside a signal handler keeps
/// it forever. Everything that may run while a crash is being reported writes through this.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawStderr;

impl Write for RawStderr {
    #[cfg(unix)]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        use std::os::fd::AsFd;

        nix::unistd::write(io::stderr().as_fd(), buf).map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes all of `bytes` to stderr, ignoring failures.
pub fn console_write(bytes: &[u8]) {
    let _ = RawStderr.write_all(bytes);
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn writes_while_another_thread_holds_the_stderr_lock() {
        let (locked_tx, locked_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let holder = thread::spawn(move || {
            let _lock = io::stderr().lock();
            locked_tx.send(()).unwrap();
            let _ = done_rx.recv_timeout(Duration::from_secs(5));
        });
        locked_rx.recv().unwrap();

        let (wrote_tx, wrote_rx) = mpsc::channel();
        thread::spawn(move || {
            let n = RawStderr.write(b"").unwrap();
            wrote_tx.send(n).unwrap();
        });
        assert_eq!(wrote_rx.recv_timeout(Duration::from_secs(2)), Ok(0));

        done_tx.send(()).unwrap();
        holder.join().unwrap();
    }
}
