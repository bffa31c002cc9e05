//! Public types for the Marquee API.

mod director;
mod movie;

pub use director::DirectorResult;
pub use movie::{Movie, MoviePage};
