//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (LONG_CTRL_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the `$LONG_CTRL_SW_ROOT/params` directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    let mut dir = crate::host::get_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?;
    dir.push("params");

    load_from(dir, param_file_path)
}

/// Load a parameter file relative to the given directory.
pub fn load_from<D, P>(params_dir: D, param_file_path: &str) -> Result<P, LoadError>
where
    D: AsRef<Path>,
    P: DeserializeOwned
{
    let path = params_dir.as_ref().join(param_file_path);

    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    toml::from_str(params_str.as_str()).map_err(LoadError::DeserialiseError)
}
