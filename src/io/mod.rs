/// CSV export of results, candidate tables and captures.
pub mod export;
