//! Shared fixtures for scale BDD scenarios.

use ess_target::config::{
    ACCESS_KEY_ID, ACCESS_KEY_SECRET, ConfigMap, ConfigError, PluginConfig, REGION,
    SCALING_GROUP_ID,
};
use ess_target::test_support::{CallLog, ScriptedFleet, ScriptedPool, instance};
use ess_target::{ErrorKind, InstanceRecord, ScaleOutcome, TargetStatus};
use rstest::fixture;
use thiserror::Error;

use crate::test_constants::{TEST_REGION, TEST_SCALING_GROUP_ID, UNHEALTHY_PREFIX};

#[derive(Clone, Debug)]
pub struct ScaleContext {
    pub log: CallLog,
    pub fleet: ScriptedFleet,
    pub pool: ScriptedPool,
    pub plugin_map: ConfigMap,
    pub outcome: Option<ScaleResult>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScaleFailure {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Clone, Debug)]
pub enum ScaleResult {
    Scaled(ScaleOutcome),
    Status(TargetStatus),
    Failure(ScaleFailure),
}

#[derive(Clone, Debug, Error)]
pub enum ScaleTestError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid scale fixture: {0}")]
    Fixture(String),
}

pub type ScaleContextResult = Result<ScaleContext, ScaleTestError>;

#[fixture]
pub fn scale_context_result() -> ScaleContextResult {
    build_scale_context()
}

#[fixture]
pub fn scale_context(scale_context_result: ScaleContextResult) -> ScaleContext {
    scale_context_result
        .unwrap_or_else(|err| panic!("scale context fixture should initialise: {err}"))
}

fn build_scale_context() -> ScaleContextResult {
    let plugin_map: ConfigMap = [
        (ACCESS_KEY_ID, "AKID"),
        (ACCESS_KEY_SECRET, "secret"),
        (REGION, TEST_REGION),
        (SCALING_GROUP_ID, TEST_SCALING_GROUP_ID),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect();
    PluginConfig::from_map(plugin_map.clone())?;

    let log = CallLog::default();
    Ok(ScaleContext {
        fleet: ScriptedFleet::new(log.clone()),
        pool: ScriptedPool::new(log.clone()),
        log,
        plugin_map,
        outcome: None,
    })
}

/// Builds `healthy` in-service members followed by `unhealthy` ones.
pub fn members(healthy: usize, unhealthy: usize) -> Vec<InstanceRecord> {
    let good = (1..=healthy).map(|n| instance(&format!("i-{n}"), "Healthy", "InService"));
    let bad = (1..=unhealthy).map(|n| {
        instance(&format!("{UNHEALTHY_PREFIX}{n}"), "Unhealthy", "InService")
    });
    good.chain(bad).collect()
}

pub fn count_as_i32(healthy: usize, unhealthy: usize) -> Result<i32, ScaleTestError> {
    i32::try_from(healthy + unhealthy)
        .map_err(|err| ScaleTestError::Fixture(format!("instance count: {err}")))
}
