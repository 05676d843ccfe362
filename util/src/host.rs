//! Host platform (linux for example) utility functions

use std::env;
use std::path::PathBuf;

/// Environment variable which can be used to point at the software root, the directory holding
/// `params/` and `sessions/`.
pub const SW_ROOT_ENV_VAR: &str = "GAIT_SW_ROOT";

/// Retrieve uname information.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the software root directory.
///
/// Uses `GAIT_SW_ROOT` if it is set, otherwise falls back to the current working directory.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match env::var_os(SW_ROOT_ENV_VAR) {
        Some(root) => Ok(PathBuf::from(root)),
        None => env::current_dir(),
    }
}
