pub mod profile;
pub mod contractor;
pub mod project;
pub mod bid;
pub mod rating;

pub use profile::*;
pub use contractor::*;
pub use project::*;
pub use bid::*;
pub use rating::*;
