pub mod searcher;
pub mod token_indexer;
pub mod tombstones;
