// Input document models: typed header sections, raw per-tick samples.

mod header;
mod sample;

pub use header::{CgroupConfig, CmonitorInfo, CpuCoreInfo, Header, Identity, OsRelease};
pub use sample::{Sample, lookup_number, number};
