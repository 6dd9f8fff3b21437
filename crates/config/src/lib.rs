//! YAML task configuration: lenient normalization plus default-path
//! bootstrap.
//!
//! Accepted entry forms under each cadence key:
//!
//! ```yaml
//! daily:
//!   - ./just_run_me.sh            # bare string: no requirements
//!   - ./also_okay:                # mapping with null: no requirements
//!   - python a.py: internet       # single requirement as a string
//!   - bash a.sh: [internet, ac_power]
//! weekly:
//!   - rotate_backups.sh: [ac_power, rerun_onfail]
//! ```
//!
//! Unknown cadence keys and malformed entries are dropped silently; the
//! scheduling core only ever sees well-formed tasks.

mod loader;
mod paths;

pub use {
    loader::{load_tasks, parse_tasks},
    paths::{default_config_path, default_state_path, ensure_default_config},
};
