use crate::ErrorKind;

/// Process exit codes readerforge's CLI returns. Mirrors the HTTP status
/// mapping used by the request API for the same error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    CliArgs,
    ResourceLimit,
    SecretOrValidation,
    LockHeld,
    Timeout,
    BackendFailure,
    Unknown,
}

impl ExitCode {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::CliArgs => 2,
            Self::ResourceLimit => 7,
            Self::SecretOrValidation => 8,
            Self::LockHeld => 9,
            Self::Timeout => 10,
            Self::BackendFailure => 70,
            Self::Unknown => 1,
        }
    }
}

#[must_use]
pub fn for_kind(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::CliArgs => ExitCode::CliArgs,
        ErrorKind::ResourceLimit => ExitCode::ResourceLimit,
        ErrorKind::SecretOrValidation => ExitCode::SecretOrValidation,
        ErrorKind::LockHeld => ExitCode::LockHeld,
        ErrorKind::Timeout => ExitCode::Timeout,
        ErrorKind::BackendFailure => ExitCode::BackendFailure,
        ErrorKind::Unknown => ExitCode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values_match_the_documented_table() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::CliArgs.as_i32(), 2);
        assert_eq!(ExitCode::ResourceLimit.as_i32(), 7);
        assert_eq!(ExitCode::SecretOrValidation.as_i32(), 8);
        assert_eq!(ExitCode::LockHeld.as_i32(), 9);
        assert_eq!(ExitCode::Timeout.as_i32(), 10);
        assert_eq!(ExitCode::BackendFailure.as_i32(), 70);
        assert_eq!(ExitCode::Unknown.as_i32(), 1);
    }
}
