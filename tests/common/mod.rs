#![allow(dead_code)]

pub use devtool_test_utils::builders;
pub use devtool_test_utils::spy_runner::SpyRunner;
pub use devtool_test_utils::{init_tracing, with_timeout, write_file};
