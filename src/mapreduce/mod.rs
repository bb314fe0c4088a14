pub mod partitioner;
pub mod mapper;
pub mod shuffle;
pub mod reducer;
pub mod aggregator;
pub mod driver;
