mod labels;
pub mod lenient;
mod measurement;
mod outcome;
mod probe_error;
mod summary;

pub use labels::*;
pub use measurement::*;
pub use outcome::*;
pub use probe_error::*;
pub use summary::*;
