//! Cursor-paginated search.

mod searcher;
mod sort;

pub use searcher::{BuildQueryFn, BuildSortFn, Criteria, GetSortFn, SearchPage, Searcher};
pub use sort::parse_sort;
