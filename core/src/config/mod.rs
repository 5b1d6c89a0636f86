mod load;
mod types;

pub use load::{
    apply_env_overrides, get_oneach_data_dir, load_default, load_from_path,
    resolve_snapshot_path,
};
pub use types::*;
