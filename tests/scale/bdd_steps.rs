//! BDD step definitions for scaling and status scenarios.

use ess_target::config::{PluginConfig, SCALING_GROUP_ID};
use ess_target::{ConfigMap, ScalingAction, TargetAdapter};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use super::test_helpers::{
    ScaleContext, ScaleFailure, ScaleResult, ScaleTestError, count_as_i32, members,
};
use crate::test_constants::UNHEALTHY_PREFIX;

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Setup(#[from] ScaleTestError),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

/// Completion polling sleeps for real intervals; paused time lets the full
/// budget elapse instantly.
fn paused_runtime() -> Result<Runtime, StepError> {
    Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|err| StepError::Assertion(err.to_string()))
}

#[given("a stable scaling group with {healthy} healthy and {unhealthy} unhealthy instances")]
fn stable_group(
    mut scale_context: ScaleContext,
    healthy: usize,
    unhealthy: usize,
) -> Result<ScaleContext, StepError> {
    let count = count_as_i32(healthy, unhealthy)?;
    scale_context.fleet = scale_context
        .fleet
        .with_status(true, count)
        .with_instances(members(healthy, unhealthy));
    Ok(scale_context)
}

#[given("an unstable scaling group with {count} instances")]
fn unstable_group(mut scale_context: ScaleContext, count: i32) -> ScaleContext {
    scale_context.fleet = scale_context.fleet.with_status(false, count);
    scale_context
}

#[given("scaling activities complete after {checks} checks")]
fn activities_complete_after(mut scale_context: ScaleContext, checks: u32) -> ScaleContext {
    scale_context.fleet = scale_context.fleet.completing_after(checks);
    scale_context
}

#[given("scaling activities never complete")]
fn activities_never_complete(mut scale_context: ScaleContext) -> ScaleContext {
    scale_context.fleet = scale_context.fleet.never_completing();
    scale_context
}

#[given("the group lookup matches {matched} groups")]
fn group_lookup_matches(mut scale_context: ScaleContext, matched: i64) -> ScaleContext {
    scale_context.fleet = scale_context.fleet.matching_groups(matched);
    scale_context
}

#[given("node draining fails")]
fn node_draining_fails(mut scale_context: ScaleContext) -> ScaleContext {
    scale_context.pool = scale_context.pool.failing_drain();
    scale_context
}

#[given("instance removal fails")]
fn instance_removal_fails(mut scale_context: ScaleContext) -> ScaleContext {
    scale_context.fleet = scale_context.fleet.failing_delete();
    scale_context
}

#[given("the node pool is not ready")]
fn pool_not_ready(mut scale_context: ScaleContext) -> ScaleContext {
    scale_context.pool = scale_context.pool.not_ready();
    scale_context
}

#[given("no scaling group id is configured")]
fn no_group_id(mut scale_context: ScaleContext) -> ScaleContext {
    scale_context.plugin_map.remove(SCALING_GROUP_ID);
    scale_context
}

fn run_scale(
    scale_context: ScaleContext,
    action: ScalingAction,
) -> Result<ScaleContext, StepError> {
    let runtime = paused_runtime()?;
    let config = PluginConfig::from_map(scale_context.plugin_map.clone())
        .map_err(ScaleTestError::from)?;
    let adapter = TargetAdapter::new(
        scale_context.fleet.clone(),
        scale_context.pool.clone(),
        config,
    );
    let cancel = CancellationToken::new();
    let result =
        runtime.block_on(async { adapter.scale(action, &ConfigMap::new(), &cancel).await });
    let outcome = match result {
        Ok(scaled) => ScaleResult::Scaled(scaled),
        Err(err) => ScaleResult::Failure(ScaleFailure {
            kind: err.kind(),
            message: err.to_string(),
        }),
    };
    Ok(ScaleContext {
        outcome: Some(outcome),
        ..scale_context
    })
}

#[when("I request a total of {count} instances")]
fn request_total(scale_context: ScaleContext, count: i64) -> Result<ScaleContext, StepError> {
    run_scale(scale_context, ScalingAction::new(count))
}

#[when("I request a dry run for {count} instances")]
fn request_dry_run(scale_context: ScaleContext, count: i64) -> Result<ScaleContext, StepError> {
    run_scale(scale_context, ScalingAction::new(count).dry_run())
}

#[when("I request the target status")]
fn request_status(scale_context: ScaleContext) -> Result<ScaleContext, StepError> {
    let runtime = paused_runtime()?;
    let config = PluginConfig::from_map(scale_context.plugin_map.clone())
        .map_err(ScaleTestError::from)?;
    let adapter = TargetAdapter::new(
        scale_context.fleet.clone(),
        scale_context.pool.clone(),
        config,
    );
    let cancel = CancellationToken::new();
    let outcome = match runtime.block_on(adapter.status(&ConfigMap::new(), &cancel)) {
        Ok(status) => ScaleResult::Status(status),
        Err(err) => ScaleResult::Failure(ScaleFailure {
            kind: err.kind(),
            message: err.to_string(),
        }),
    };
    Ok(ScaleContext {
        outcome: Some(outcome),
        ..scale_context
    })
}

#[then("the scaling succeeds with outcome \"{expected}\"")]
fn scaling_succeeds(scale_context: &ScaleContext, expected: String) -> Result<(), StepError> {
    match &scale_context.outcome {
        Some(ScaleResult::Scaled(outcome)) if outcome.to_string() == expected => Ok(()),
        Some(ScaleResult::Scaled(outcome)) => Err(StepError::Assertion(format!(
            "expected outcome {expected}, got {outcome}"
        ))),
        Some(ScaleResult::Failure(failure)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {}",
            failure.message
        ))),
        other => Err(StepError::Assertion(format!(
            "expected scale outcome, got {other:?}"
        ))),
    }
}

#[then("the scaling fails with kind \"{kind}\"")]
fn scaling_fails(scale_context: &ScaleContext, kind: String) -> Result<(), StepError> {
    let Some(ScaleResult::Failure(failure)) = &scale_context.outcome else {
        return Err(StepError::Assertion(format!(
            "expected failure outcome, got {:?}",
            scale_context.outcome
        )));
    };
    if failure.kind.to_string() == kind {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure kind {kind}, got {} ({})",
            failure.kind, failure.message
        )))
    }
}

#[then("the group capacity is set to {capacity}")]
fn capacity_set(scale_context: &ScaleContext, capacity: i32) -> Result<(), StepError> {
    let resized = scale_context.fleet.resized();
    if resized == [capacity] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a single resize to {capacity}, got {resized:?}"
        )))
    }
}

#[then("{checks} completion checks were made")]
fn completion_checks(scale_context: &ScaleContext, checks: usize) -> Result<(), StepError> {
    let made = scale_context.log.count("activity_status");
    if made == checks {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {checks} completion checks, got {made}"
        )))
    }
}

#[then("{count} instances are deleted")]
fn instances_deleted(scale_context: &ScaleContext, count: usize) -> Result<(), StepError> {
    let deleted: usize = scale_context.fleet.deleted().iter().map(Vec::len).sum();
    if deleted == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} deleted instances, got {deleted}"
        )))
    }
}

#[then("no instances are deleted")]
fn no_instances_deleted(scale_context: &ScaleContext) -> Result<(), StepError> {
    if scale_context.log.count("delete_instances") == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "instances should not be deleted",
        )))
    }
}

#[then("no unhealthy instance is deleted")]
fn no_unhealthy_deleted(scale_context: &ScaleContext) -> Result<(), StepError> {
    let deleted = scale_context.fleet.deleted();
    match deleted
        .iter()
        .flatten()
        .find(|id| id.starts_with(UNHEALTHY_PREFIX))
    {
        Some(id) => Err(StepError::Assertion(format!(
            "unhealthy instance {id} was deleted"
        ))),
        None => Ok(()),
    }
}

#[then("the removed nodes are released")]
fn nodes_released(scale_context: &ScaleContext) -> Result<(), StepError> {
    let notified = scale_context.pool.notified();
    let deleted = scale_context.fleet.deleted();
    let released: Vec<_> = notified.iter().map(|selection| selection.remote_ids()).collect();
    if !released.is_empty() && released == deleted {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected released {released:?} to match deleted {deleted:?}"
        )))
    }
}

#[then("the removed nodes are not released")]
fn nodes_not_released(scale_context: &ScaleContext) -> Result<(), StepError> {
    if scale_context.log.count("notify_removed") == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "nodes should not be released",
        )))
    }
}

#[then("no mutating call is made")]
fn no_mutation(scale_context: &ScaleContext) -> Result<(), StepError> {
    let entries = scale_context.log.entries();
    let mutating = ["resize", "delete_instances", "select_and_drain"];
    if entries.iter().any(|entry| mutating.contains(entry)) {
        Err(StepError::Assertion(format!(
            "expected no mutation, got {entries:?}"
        )))
    } else {
        Ok(())
    }
}

#[then("no remote call is made")]
fn no_remote_call(scale_context: &ScaleContext) -> Result<(), StepError> {
    let entries = scale_context.log.entries();
    if entries.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no calls, got {entries:?}"
        )))
    }
}

#[then("the target reports ready \"{ready}\" with count {count}")]
fn target_reports(scale_context: &ScaleContext, ready: bool, count: i64) -> Result<(), StepError> {
    match &scale_context.outcome {
        Some(ScaleResult::Status(status)) if status.ready == ready && status.count == count => {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected ready={ready} count={count}, got {other:?}"
        ))),
    }
}

#[then("the scaling group is not queried")]
fn group_not_queried(scale_context: &ScaleContext) -> Result<(), StepError> {
    if scale_context.log.count("status") == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "scaling group should not be queried",
        )))
    }
}
