pub(crate) mod distinct;
pub(crate) mod ordering;
pub(crate) mod slicing;
pub mod sources;

#[cfg(feature = "io-streams")]
pub mod io;

// Only re-export files with top-level functions
pub use sources::*;

#[cfg(feature = "io-streams")]
pub use io::*;
