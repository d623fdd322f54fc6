//! Domain services behind the HTTP routes.

pub mod analysis;
pub mod completion;
pub mod image;
