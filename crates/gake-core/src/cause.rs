//! Crash cause taxonomy.
//!
//! Every abnormal termination of Gake maps to exactly one [`CrashCause`]. The numeric value
//! doubles as the process exit status, so the discriminants are part of the external contract
//! and must never be renumbered.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CrashCause {
    SuccessfulExit = 0x00,
    TechnicalFailure = 0x01,
    GnuStyleOptions = 0x02,
    Abort = 0x03,
    BusError = 0x04,
    FloatingPointException = 0x05,
    Hangup = 0x06,
    IllegalInstruction = 0x07,
    UserInterrupt = 0x08,
    SegmentationFault = 0x09,
    Terminated = 0x0A,
    BadSyscall = 0x0B,
    AssetsInvalid = 0x0C,
    BatteryInsufficient = 0x0D,
    Unknown = 0x0E,
}

impl CrashCause {
    pub const ALL: [CrashCause; 15] = [
        CrashCause::SuccessfulExit,
        CrashCause::TechnicalFailure,
        CrashCause::GnuStyleOptions,
        CrashCause::Abort,
        CrashCause::BusError,
        CrashCause::FloatingPointException,
        CrashCause::Hangup,
        CrashCause::IllegalInstruction,
        CrashCause::UserInterrupt,
        CrashCause::SegmentationFault,
        CrashCause::Terminated,
        CrashCause::BadSyscall,
        CrashCause::AssetsInvalid,
        CrashCause::BatteryInsufficient,
        CrashCause::Unknown,
    ];

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn exit_code(self) -> i32 {
        i32::from(self.code())
    }

    /// Out-of-range codes collapse to [`CrashCause::Unknown`].
    pub fn from_code(code: u8) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .unwrap_or(CrashCause::Unknown)
    }

    /// Fixed explanatory text shown in the report.
    pub fn explanation(self) -> &'static str {
        match self {
            CrashCause::SuccessfulExit => "Crash with successful exit.  This shouldn't happen.",
            CrashCause::TechnicalFailure => {
                "Technical failure.  This should not be handled by the crash handler."
            }
            CrashCause::GnuStyleOptions => {
                "User has attempted to use GNU-style options when starting program."
            }
            CrashCause::Abort => "The program aborted itself after detecting an internal error.",
            CrashCause::BusError => "Bus error:  the program accessed memory in an invalid way.",
            CrashCause::FloatingPointException => {
                "Erroneous arithmetic operation (floating-point exception)."
            }
            CrashCause::Hangup => "The controlling terminal was closed (hangup).",
            CrashCause::IllegalInstruction => "The program tried to execute an illegal instruction.",
            CrashCause::UserInterrupt => "The program was interrupted by the user.",
            CrashCause::SegmentationFault => {
                "Segmentation fault:  the program accessed memory it does not own."
            }
            CrashCause::Terminated => "The program was asked to terminate.",
            CrashCause::BadSyscall => "The program made an invalid system call.",
            CrashCause::AssetsInvalid => {
                "One or more game assets are missing or corrupted.  Please reinstall Gake."
            }
            CrashCause::BatteryInsufficient => {
                "There is not enough battery left to play safely.  Please plug in your computer."
            }
            CrashCause::Unknown => "Unknown cause.  This is a bug in Gake's crash handler.",
        }
    }

    /// Signals other than a user interrupt hand control back to the default disposition so the
    /// OS applies its own termination semantics (core dumps and the like). Everything else exits
    /// with the code.
    pub fn reraises_default(self) -> bool {
        matches!(
            self,
            CrashCause::Abort
                | CrashCause::BusError
                | CrashCause::FloatingPointException
                | CrashCause::Hangup
                | CrashCause::IllegalInstruction
                | CrashCause::SegmentationFault
                | CrashCause::Terminated
                | CrashCause::BadSyscall
        )
    }
}

impl fmt::Display for CrashCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.code())
    }
}
