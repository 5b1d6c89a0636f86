pub mod file;

pub use file::FileTopologyProvider;
