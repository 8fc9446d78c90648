use std::io;

use serde::Serialize;
use thiserror::Error;

/// OS-style error codes. Policy refusals and native failures share this
/// type so scripts cannot tell one from the other.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Errno {
    #[error("Operation not permitted")]
    Perm,
    #[error("No such file or directory")]
    NoEnt,
    #[error("Input/output error")]
    Io,
    #[error("No child processes")]
    Child,
    #[error("Permission denied")]
    Acces,
    #[error("File exists")]
    Exist,
    #[error("Not a directory")]
    NotDir,
    #[error("Is a directory")]
    IsDir,
    #[error("Invalid argument")]
    Inval,
}

impl Errno {
    pub fn code(self) -> i32 {
        match self {
            Self::Perm => 1,
            Self::NoEnt => 2,
            Self::Io => 5,
            Self::Child => 10,
            Self::Acces => 13,
            Self::Exist => 17,
            Self::NotDir => 20,
            Self::IsDir => 21,
            Self::Inval => 22,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        [
            Self::Perm,
            Self::NoEnt,
            Self::Io,
            Self::Child,
            Self::Acces,
            Self::Exist,
            Self::NotDir,
            Self::IsDir,
            Self::Inval,
        ]
        .into_iter()
        .find(|errno| errno.code() == code)
    }
}

impl From<&io::Error> for Errno {
    fn from(error: &io::Error) -> Self {
        if let Some(errno) = error.raw_os_error().and_then(Self::from_code) {
            return errno;
        }
        match error.kind() {
            io::ErrorKind::NotFound => Self::NoEnt,
            io::ErrorKind::PermissionDenied => Self::Acces,
            io::ErrorKind::AlreadyExists => Self::Exist,
            io::ErrorKind::InvalidInput => Self::Inval,
            _ => Self::Io,
        }
    }
}

impl From<io::Error> for Errno {
    fn from(error: io::Error) -> Self {
        Self::from(&error)
    }
}

#[cfg(test)]
mod errno_tests {
    use super::*;

    #[test]
    fn codes_match_posix_values() {
        assert_eq!(Errno::Perm.code(), 1);
        assert_eq!(Errno::Child.code(), 10);
        assert_eq!(Errno::Inval.code(), 22);
        assert_eq!(Errno::from_code(2), Some(Errno::NoEnt));
        assert_eq!(Errno::from_code(999), None);
    }

    #[test]
    fn io_errors_map_by_kind_when_no_raw_code() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(Errno::from(&missing), Errno::NoEnt);
        assert_eq!(Errno::from(io::Error::other("x")), Errno::Io);
    }

    #[test]
    fn display_uses_strerror_text() {
        assert_eq!(Errno::Perm.to_string(), "Operation not permitted");
    }
}
