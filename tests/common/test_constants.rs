//! Constants shared by the scripted-fleet integration tests.
//!
//! Each top-level file under `tests/` builds as its own crate, so this file is
//! pulled in with `#[path = "common/test_constants.rs"]` rather than through a
//! separate test binary.

/// Region used by every scripted scaling group.
pub const TEST_REGION: &str = "cn-hangzhou";

/// Scaling group id configured at plugin level.
pub const TEST_SCALING_GROUP_ID: &str = "asg-bdd";

/// Prefix of instances the scripted fleet reports as unhealthy.
pub const UNHEALTHY_PREFIX: &str = "sick-";
