//! Flex: index views, hydrated collections and cached operation calls
//!
//! `FlexDirectory` is the composition root for one object type.
//! `FlexIndex` is an immutable view over its reconciled index; operations
//! that need full objects run on a `FlexCollection` and go through the
//! method cache.

mod collection;
mod directory;
mod errors;
mod object;
mod ordering;
mod result;
mod view;

pub use collection::FlexCollection;
pub use directory::{FlexDirectory, FlexDirectoryBuilder};
pub use errors::{FlexError, FlexResult};
pub use object::FlexObject;
pub use ordering::{sort_by_orderings, Direction, Orderings, SortKey};
pub use result::CallResult;
pub use view::FlexIndex;
