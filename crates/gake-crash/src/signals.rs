//! Signal-context half of the crash handler.
//!
//! Everything reachable from [`on_signal`] is async-signal-safe: atomics, `write(2)`, `pause(2)`,
//! `signal(2)` and `raise(3)`. The report itself is built later on the watcher thread.

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use gake_core::{CrashCause, GakeResult, ShutdownToken};
use libc::{c_int, c_void, siginfo_t};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

/// Signals routed to the crash handler. `SIGUSR1` is reserved for explicit crash requests.
pub const HANDLED: [Signal; 11] = [
    Signal::SIGABRT,
    Signal::SIGBUS,
    Signal::SIGFPE,
    Signal::SIGHUP,
    Signal::SIGILL,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGSEGV,
    Signal::SIGTERM,
    Signal::SIGUSR1,
    Signal::SIGSYS,
];

/// Advisory signals the game does not care about.
pub const IGNORED: [Signal; 4] = [
    Signal::SIGALRM,
    Signal::SIGPIPE,
    Signal::SIGUSR2,
    Signal::SIGVTALRM,
];

pub const CRASH_SIGNAL: Signal = Signal::SIGUSR1;

static WAKE_FD: AtomicI32 = AtomicI32::new(-1);
static CLAIMED: AtomicBool = AtomicBool::new(false);
static QUIT_BENIGN: AtomicBool = AtomicBool::new(true);

static PENDING_SIGNO: AtomicI32 = AtomicI32::new(0);
static PENDING_CODE: AtomicI32 = AtomicI32::new(0);
static PENDING_ADDR: AtomicUsize = AtomicUsize::new(0);

/// What the signal handler captured: signal number, `si_code` and fault address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEvent {
    pub signo: i32,
    pub code: i32,
    pub addr: usize,
}

impl SignalEvent {
    pub const fn new(signo: i32, code: i32, addr: usize) -> Self {
        Self { signo, code, addr }
    }

    /// The event stored by the last handler invocation.
    pub(crate) fn pending() -> Self {
        Self {
            signo: PENDING_SIGNO.load(Ordering::SeqCst),
            code: PENDING_CODE.load(Ordering::SeqCst),
            addr: PENDING_ADDR.load(Ordering::SeqCst),
        }
    }

    pub fn signal(&self) -> Option<Signal> {
        Signal::try_from(self.signo).ok()
    }

    #[inline]
    pub fn is_crash_request(&self) -> bool {
        self.signo == CRASH_SIGNAL as i32
    }

    /// Cause code for the signal. The crash-request signal resolves through the request slot.
    pub fn cause(&self) -> CrashCause {
        match self.signal() {
            Some(Signal::SIGABRT) => CrashCause::Abort,
            Some(Signal::SIGBUS) => CrashCause::BusError,
            Some(Signal::SIGFPE) => CrashCause::FloatingPointException,
            Some(Signal::SIGHUP) => CrashCause::Hangup,
            Some(Signal::SIGILL) => CrashCause::IllegalInstruction,
            Some(Signal::SIGINT) | Some(Signal::SIGQUIT) => CrashCause::UserInterrupt,
            Some(Signal::SIGSEGV) => CrashCause::SegmentationFault,
            Some(Signal::SIGTERM) => CrashCause::Terminated,
            Some(Signal::SIGSYS) => CrashCause::BadSyscall,
            _ => CrashCause::Unknown,
        }
    }

    /// Human-readable account of the signal and its sub-code.
    pub fn describe(&self) -> String {
        let name = self.signal().map_or("unknown signal", |s| s.as_str());
        if self.code <= 0 {
            return format!("{name} was sent by a process (si_code {}).", self.code);
        }

        let detail = match self.signal() {
            Some(Signal::SIGSEGV) => segv_detail(self.code),
            Some(Signal::SIGBUS) => bus_detail(self.code),
            Some(Signal::SIGFPE) => fpe_detail(self.code),
            Some(Signal::SIGILL) => ill_detail(self.code),
            _ => None,
        };

        match detail {
            Some(d) if has_fault_address(self.signal()) => {
                format!("{name}: {d} (address {:#x}).", self.addr)
            }
            Some(d) => format!("{name}: {d}."),
            None => format!("{name} (si_code {}).", self.code),
        }
    }
}

fn has_fault_address(sig: Option<Signal>) -> bool {
    matches!(
        sig,
        Some(Signal::SIGSEGV | Signal::SIGBUS | Signal::SIGFPE | Signal::SIGILL)
    )
}

// Linux si_code numbering.
fn segv_detail(code: i32) -> Option<&'static str> {
    Some(match code {
        1 => "address not mapped to object",
        2 => "invalid permissions for mapped object",
        _ => return None,
    })
}

fn bus_detail(code: i32) -> Option<&'static str> {
    Some(match code {
        1 => "invalid address alignment",
        2 => "nonexistent physical address",
        3 => "object-specific hardware error",
        _ => return None,
    })
}

fn fpe_detail(code: i32) -> Option<&'static str> {
    Some(match code {
        1 => "integer divide by zero",
        2 => "integer overflow",
        3 => "floating-point divide by zero",
        4 => "floating-point overflow",
        5 => "floating-point underflow",
        6 => "floating-point inexact result",
        7 => "floating-point invalid operation",
        8 => "subscript out of range",
        _ => return None,
    })
}

fn ill_detail(code: i32) -> Option<&'static str> {
    Some(match code {
        1 => "illegal opcode",
        2 => "illegal operand",
        3 => "illegal addressing mode",
        4 => "illegal trap",
        5 => "privileged opcode",
        6 => "privileged register",
        7 => "coprocessor error",
        8 => "internal stack error",
        _ => return None,
    })
}

pub(crate) fn handled_set() -> SigSet {
    let mut set = SigSet::empty();
    for sig in HANDLED {
        set.add(sig);
    }
    set
}

/// Points every handled signal at [`on_signal`] and ignores the advisory ones.
pub(crate) fn install(wake_fd: RawFd, quit_is_benign: bool) -> GakeResult<()> {
    QUIT_BENIGN.store(quit_is_benign, Ordering::SeqCst);
    WAKE_FD.store(wake_fd, Ordering::SeqCst);

    let handle = SigAction::new(
        SigHandler::SigAction(on_signal),
        SaFlags::SA_SIGINFO,
        SigSet::empty(),
    );
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());

    for sig in HANDLED {
        // SAFETY: `on_signal` only performs async-signal-safe operations.
        unsafe { sigaction(sig, &handle) }?;
    }
    for sig in IGNORED {
        // SAFETY: ignoring a signal installs no code.
        unsafe { sigaction(sig, &ignore) }?;
    }
    Ok(())
}

#[inline]
pub(crate) fn is_armed() -> bool {
    WAKE_FD.load(Ordering::SeqCst) >= 0
}

/// Restores the default disposition of `sig`.
pub(crate) fn restore_default(sig: Signal) -> GakeResult<()> {
    let dfl = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: restoring the default disposition installs no code.
    unsafe { sigaction(sig, &dfl) }?;
    Ok(())
}

fn is_benign(signo: c_int) -> bool {
    signo == libc::SIGINT || (signo == libc::SIGQUIT && QUIT_BENIGN.load(Ordering::SeqCst))
}

fn reraise_default(signo: c_int) {
    // SAFETY: both calls are async-signal-safe. The signal stays blocked until the handler
    // returns, then the default action runs.
    unsafe {
        libc::signal(signo, libc::SIG_DFL);
        libc::raise(signo);
    }
}

fn park_forever() -> ! {
    loop {
        // SAFETY: pause(2) is async-signal-safe and has no preconditions.
        unsafe {
            libc::pause();
        }
    }
}

extern "C" fn on_signal(signo: c_int, info: *mut siginfo_t, _ctx: *mut c_void) {
    if is_benign(signo) {
        ShutdownToken::request();
        return;
    }

    if CLAIMED.swap(true, Ordering::SeqCst) {
        // A report is already in progress. Further crash requests wait for it; anything else
        // falls through to the OS.
        if signo == libc::SIGUSR1 {
            park_forever();
        }
        reraise_default(signo);
        return;
    }

    let (code, addr) = if info.is_null() {
        (0, 0)
    } else {
        // SAFETY: the kernel hands SA_SIGINFO handlers a valid siginfo_t. `si_addr` is only
        // meaningful for the fault signals.
        unsafe {
            let code = (*info).si_code;
            let faults = matches!(
                signo,
                libc::SIGSEGV | libc::SIGBUS | libc::SIGFPE | libc::SIGILL
            );
            let addr = if faults { (*info).si_addr() as usize } else { 0 };
            (code, addr)
        }
    };

    PENDING_SIGNO.store(signo, Ordering::SeqCst);
    PENDING_CODE.store(code, Ordering::SeqCst);
    PENDING_ADDR.store(addr, Ordering::SeqCst);

    let fd = WAKE_FD.load(Ordering::SeqCst);
    if fd < 0 {
        reraise_default(signo);
        return;
    }

    let byte = 1u8;
    // SAFETY: `fd` is the write end of the watcher socket, kept open for the process lifetime.
    let written = unsafe { libc::write(fd, (&byte as *const u8).cast(), 1) };
    if written != 1 {
        reraise_default(signo);
        return;
    }

    park_forever();
}
