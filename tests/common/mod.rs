#![allow(dead_code)]

pub use taskgraph_test_utils::builders;
pub use taskgraph_test_utils::fake_spawner;
pub use taskgraph_test_utils::{init_tracing, with_timeout};
