//! Command implementations for the streamarc CLI.

pub mod detect;
pub mod extract;
pub mod list;

pub use detect::cmd_detect;
pub use extract::{ExtractOptions, cmd_extract};
pub use list::{ListOptions, cmd_list};
pub use test::cmd_test;
