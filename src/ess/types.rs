//! Wire DTOs for the ESS `2022-02-22` API.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeScalingGroupsResponse {
    #[serde(default)]
    pub(crate) total_count: i64,
    #[serde(default)]
    pub(crate) scaling_groups: Vec<ScalingGroupDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ScalingGroupDto {
    #[serde(default)]
    pub(crate) lifecycle_state: String,
    #[serde(default)]
    pub(crate) total_capacity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeScalingInstancesResponse {
    #[serde(default)]
    pub(crate) total_count: i64,
    #[serde(default)]
    pub(crate) scaling_instances: Vec<ScalingInstanceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ScalingInstanceDto {
    pub(crate) instance_id: String,
    #[serde(default)]
    pub(crate) health_status: String,
    #[serde(default)]
    pub(crate) lifecycle_state: String,
}

/// Shared by `ScaleWithAdjustment` and `RemoveInstances`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ActivityStartedResponse {
    pub(crate) scaling_activity_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeScalingActivitiesResponse {
    #[serde(default)]
    pub(crate) total_count: i64,
    #[serde(default)]
    pub(crate) scaling_activities: Vec<ScalingActivityDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ScalingActivityDto {
    #[serde(default)]
    pub(crate) progress: i32,
    #[serde(default)]
    pub(crate) status_code: String,
}
