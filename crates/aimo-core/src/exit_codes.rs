//! Exit code constants matching `spec.md` §6: `0` success, `1` generic
//! failure, `2` pinning mismatch, `3` guarded-skip misuse.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const GENERIC_FAILURE: ExitCode = ExitCode(1);
    pub const PINNING_MISMATCH: ExitCode = ExitCode(2);
    pub const GUARDED_SKIP_MISUSE: ExitCode = ExitCode(3);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}
