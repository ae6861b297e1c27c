mod package;
mod transaction;

pub use package::*;
pub use transaction::*;
