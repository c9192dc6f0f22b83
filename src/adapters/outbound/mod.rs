pub mod file_logger;
pub mod network_source;
pub mod noop_logger;
pub mod road_network;
pub mod tracing_logger;
pub mod trajectory_files;

pub use file_logger::*;
pub use network_source::*;
pub use noop_logger::*;
pub use road_network::*;
pub use tracing_logger::*;
pub use trajectory_files::*;
