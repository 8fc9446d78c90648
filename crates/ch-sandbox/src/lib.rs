//! Filesystem policy for script-triggered I/O.
//!
//! Reads are confined to simple relative paths; writes are further confined
//! to `<active-context-name>/write`. Every refusal surfaces as an [`Errno`],
//! the same type native failures are reported with.

pub mod errno;
pub mod fs;
pub mod policy;

pub use errno::Errno;
pub use fs::SandboxedFs;
pub use policy::{
    is_simple_path, parse_open_mode, safe_read_path, safe_write_path, write_prefix, OpenMode,
    WRITE_DIR,
};
