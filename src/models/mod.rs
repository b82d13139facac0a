pub mod dates;
pub mod digest;
pub mod ids;

pub use dates::*;
pub use digest::*;
pub use ids::*;
