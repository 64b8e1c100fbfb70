pub mod church;
pub mod config;
pub mod member;
pub mod pastor;
pub mod relationship;

pub use church::*;
pub use config::*;
pub use member::*;
pub use pastor::*;
pub use relationship::*;
