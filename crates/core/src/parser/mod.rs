//! Output parsing — stateless transforms from raw CLI output to the
//! canonical model.

pub mod ansi;
pub mod progress;
pub mod records;
pub mod stats;
pub mod units;

pub use ansi::strip_ansi;
pub use progress::{parse_build_progress, parse_pull_progress};
pub use records::{
    parse_container_inspect, parse_container_list, parse_image_inspect, parse_image_list,
    parse_network_inspect, parse_network_list, parse_volume_inspect, parse_volume_list,
};
pub use stats::parse_container_stats;
pub use units::parse_size;
