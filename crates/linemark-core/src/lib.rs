mod block;
mod element;
mod emit;
mod error;
mod inline;
mod line;
mod markdown;
mod options;
mod reference;
mod registry;

pub use error::Error;
pub use markdown::{Markdown, convert};
pub use options::Options;
pub use registry::Registry;
