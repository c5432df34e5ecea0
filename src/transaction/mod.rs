//! Transactions and the category taxonomy they are sorted into.

pub mod model;
pub mod taxonomy;

pub use model::{Scalar, Transaction};
pub use taxonomy::{ButtonStyle, Category};
