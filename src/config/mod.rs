//! Pool source configuration.
//!
//! A `Source` names the remote repository, the branch holding the pool, and
//! the pool directory inside it. It arrives as the `source` object of every
//! resource request. Unknown fields are ignored for forward compatibility.

mod model;
mod operations;


pub use model::{DEFAULT_RETRY_DELAY, Source};
