/// nwm_service: publishes current NWM streamflow as JSON for the map frontend.
///
/// # Module structure
///
/// ```text
/// nwm_service
/// ├── model    — shared data types (RemoteFileHandle, PublishedDocument, NwmError)
/// ├── config   — environment-sourced runtime configuration + bucket constants
/// ├── locate   — bounded newest-first scan of the NWM date partitions
/// ├── extract  — NetCDF → filtered COMID→streamflow map, styling classifiers
/// ├── storage  — object-store collaborators (anonymous NWM source, output store)
/// └── publish  — document assembly, compact/pretty JSON, local dry-run output
/// ```

/// Public modules
pub mod config;
pub mod extract;
pub mod locate;
pub mod model;
pub mod publish;
pub mod storage;
