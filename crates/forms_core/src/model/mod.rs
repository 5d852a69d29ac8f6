pub mod definition;
pub mod metadata;
pub mod version;

pub use definition::*;
pub use metadata::*;
pub use version::*;
