//! BDD scenarios for scaling and status reporting.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ScaleContext, scale_context};

#[scenario(
    path = "tests/features/scale.feature",
    name = "Scale out to an absolute total capacity"
)]
fn scenario_scale_out(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "Scale in drains and removes exactly the difference"
)]
fn scenario_scale_in(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "Scale in never removes unhealthy instances"
)]
fn scenario_scale_in_skips_unhealthy(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "Matching capacity changes nothing"
)]
fn scenario_no_op(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "A never-finishing activity exhausts the check budget"
)]
fn scenario_timeout(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "Dry runs make no remote call"
)]
fn scenario_dry_run(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "Drain failures prevent deletion"
)]
fn scenario_drain_failure(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "Removal failures skip node release"
)]
fn scenario_removal_failure(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "A missing scaling group is reported as not found"
)]
fn scenario_group_missing(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "An ambiguous scaling group is reported as not found"
)]
fn scenario_group_ambiguous(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/scale.feature",
    name = "A missing scaling group id fails before any remote call"
)]
fn scenario_missing_group_id(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/status.feature",
    name = "A stable group reports ready with its capacity"
)]
fn scenario_status_ready(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/status.feature",
    name = "A group that is still changing reports not ready"
)]
fn scenario_status_unstable(scale_context: ScaleContext) {
    drop(scale_context);
}

#[scenario(
    path = "tests/features/status.feature",
    name = "A pool that is not ready skips the group lookup"
)]
fn scenario_status_pool_not_ready(scale_context: ScaleContext) {
    drop(scale_context);
}
