// Library for tests to access modules

pub mod cgroup_metrics;
pub mod chart;
pub mod config;
pub mod extractors;
pub mod filter;
pub mod input;
pub mod models;
pub mod report;
pub mod sample_set;
pub mod statistics;
pub mod table;
pub mod top_n;
pub mod version;
