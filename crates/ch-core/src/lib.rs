pub mod callins;
pub mod error;
pub mod payload;
pub mod types;
pub mod value;

pub use callins::*;
pub use error::HostError;
pub use payload::*;
pub use types::*;
pub use value::*;
