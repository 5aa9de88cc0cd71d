pub mod grid_search;

pub use grid_search::{enumerate_cells, GridCell, GridOutcome, GridPoint, GridSearchEngine};
