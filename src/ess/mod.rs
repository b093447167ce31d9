//! Alibaba Cloud ESS implementation of [`Fleet`].
//!
//! Every operation is one signed OpenAPI RPC call (the instance listing may
//! take several pages). Nothing is retried here.

mod error;
mod signer;
mod types;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Credentials;
use crate::fleet::{
    ActivityId, Fleet, FleetError, FleetFuture, GroupStatus, HealthStatus, InstanceId,
    InstanceRecord, LifecycleState, ScalingGroupRef,
};
use signer::{RequestContext, RequestSigner};
use types::{
    ActivityStartedResponse, ApiErrorBody, DescribeScalingActivitiesResponse,
    DescribeScalingGroupsResponse, DescribeScalingInstancesResponse,
};

pub use error::EssError;

/// OpenAPI version of the ESS product.
pub const API_VERSION: &str = "2022-02-22";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: i64 = 50;
const ACTIVE_STATE: &str = "Active";
const COMPLETE_PROGRESS: i32 = 100;
const FAILED_STATUS_CODES: [&str; 2] = ["Failed", "Rejected"];

type Params = BTreeMap<String, String>;

/// Fleet backed by the Alibaba Cloud Auto Scaling (ESS) API.
#[derive(Clone)]
pub struct EssFleet {
    client: reqwest::Client,
    base_url: String,
    host: String,
    access_key_id: String,
    access_key_secret: String,
}

impl std::fmt::Debug for EssFleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EssFleet")
            .field("base_url", &self.base_url)
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// Splits an endpoint into a base URL and the host used for signing.
///
/// Bare hosts default to HTTPS.
fn split_endpoint(endpoint: &str) -> (String, String) {
    let trimmed = endpoint.trim().trim_end_matches('/');
    match trimmed.split_once("://") {
        Some((scheme, host)) => (format!("{scheme}://{host}"), host.to_owned()),
        None => (format!("https://{trimmed}"), trimmed.to_owned()),
    }
}

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

fn group_status(
    group: &ScalingGroupRef,
    response: &DescribeScalingGroupsResponse,
) -> Result<GroupStatus, FleetError> {
    let not_found = || FleetError::NotFound {
        resource: "scaling group",
        id: group.id.clone(),
        matched: response.total_count,
    };
    if response.total_count != 1 {
        return Err(not_found());
    }
    let found = response.scaling_groups.first().ok_or_else(not_found)?;
    Ok(GroupStatus {
        stable: found.lifecycle_state == ACTIVE_STATE,
        current_count: found.total_capacity,
    })
}

fn activity_done(
    activity: &ActivityId,
    response: &DescribeScalingActivitiesResponse,
) -> Result<bool, FleetError> {
    let not_found = || FleetError::NotFound {
        resource: "scaling activity",
        id: activity.to_string(),
        matched: response.total_count,
    };
    if response.total_count != 1 {
        return Err(not_found());
    }
    let found = response.scaling_activities.first().ok_or_else(not_found)?;
    if FAILED_STATUS_CODES.contains(&found.status_code.as_str()) {
        warn!(
            activity_id = %activity,
            status_code = %found.status_code,
            progress = found.progress,
            "scaling activity reported failure"
        );
    }
    Ok(found.progress == COMPLETE_PROGRESS)
}

impl EssFleet {
    /// Builds a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EssError::Client`] when the HTTP client cannot be built.
    pub fn new(credentials: &Credentials) -> Result<Self, EssError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| EssError::Client {
                message: err.to_string(),
            })?;
        let (base_url, host) = split_endpoint(&credentials.endpoint);
        Ok(Self {
            client,
            base_url,
            host,
            access_key_id: credentials.access_key_id.clone(),
            access_key_secret: credentials.access_key_secret.clone(),
        })
    }

    async fn call<R>(&self, action: &'static str, params: &Params) -> Result<R, EssError>
    where
        R: DeserializeOwned,
    {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = Uuid::new_v4().simple().to_string();
        let signed = RequestSigner::new(&self.access_key_id, &self.access_key_secret).sign(
            RequestContext {
                host: &self.host,
                action,
                version: API_VERSION,
                timestamp: &timestamp,
                nonce: &nonce,
            },
            params,
        )?;

        debug!(action, "calling ESS");
        let url = format!("{}/?{}", self.base_url, signed.query);
        let mut request = self.client.post(url);
        for (name, value) in signed.headers {
            request = request.header(name, value);
        }
        let http_err = |err: reqwest::Error| EssError::Http {
            action,
            message: err.to_string(),
        };
        let response = request.send().await.map_err(http_err)?;
        let status = response.status();
        let body = response.text().await.map_err(http_err)?;

        if !status.is_success() {
            let detail: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(EssError::Api {
                action,
                status: status.as_u16(),
                code: detail.code,
                message: detail.message,
                request_id: detail.request_id,
            });
        }
        serde_json::from_str(&body).map_err(|err| EssError::Decode {
            action,
            message: err.to_string(),
        })
    }

    async fn instance_page(
        &self,
        group: &ScalingGroupRef,
        page: i64,
    ) -> Result<DescribeScalingInstancesResponse, EssError> {
        let page_number = page.to_string();
        let page_size = PAGE_SIZE.to_string();
        self.call(
            "DescribeScalingInstances",
            &params(&[
                ("RegionId", group.region.as_str()),
                ("ScalingGroupId", group.id.as_str()),
                ("PageNumber", page_number.as_str()),
                ("PageSize", page_size.as_str()),
            ]),
        )
        .await
    }
}

fn to_record(dto: types::ScalingInstanceDto) -> InstanceRecord {
    InstanceRecord {
        instance_id: InstanceId::new(dto.instance_id),
        health_status: HealthStatus::from(dto.health_status.as_str()),
        lifecycle_state: LifecycleState::from(dto.lifecycle_state.as_str()),
    }
}

impl Fleet for EssFleet {
    fn status<'a>(&'a self, group: &'a ScalingGroupRef) -> FleetFuture<'a, GroupStatus> {
        Box::pin(async move {
            let response: DescribeScalingGroupsResponse = self
                .call(
                    "DescribeScalingGroups",
                    &params(&[
                        ("RegionId", group.region.as_str()),
                        ("ScalingGroupIds.1", group.id.as_str()),
                    ]),
                )
                .await?;
            group_status(group, &response)
        })
    }

    fn list_instances<'a>(
        &'a self,
        group: &'a ScalingGroupRef,
    ) -> FleetFuture<'a, Vec<InstanceRecord>> {
        Box::pin(async move {
            let mut records = Vec::new();
            let mut page = 1_i64;
            loop {
                let response = self.instance_page(group, page).await?;
                let fetched = response.scaling_instances.len();
                records.extend(response.scaling_instances.into_iter().map(to_record));
                let total = usize::try_from(response.total_count).unwrap_or(0);
                if fetched == 0 || records.len() >= total {
                    break;
                }
                page += 1;
            }
            debug!(instances = records.len(), pages = page, "listed scaling group instances");
            Ok(records)
        })
    }

    fn resize<'a>(
        &'a self,
        group: &'a ScalingGroupRef,
        total_capacity: i32,
    ) -> FleetFuture<'a, ActivityId> {
        Box::pin(async move {
            let capacity = total_capacity.to_string();
            let response: ActivityStartedResponse = self
                .call(
                    "ScaleWithAdjustment",
                    &params(&[
                        ("RegionId", group.region.as_str()),
                        ("ScalingGroupId", group.id.as_str()),
                        ("AdjustmentType", "TotalCapacity"),
                        ("AdjustmentValue", capacity.as_str()),
                    ]),
                )
                .await?;
            Ok(ActivityId::new(response.scaling_activity_id))
        })
    }

    fn delete_instances<'a>(
        &'a self,
        group: &'a ScalingGroupRef,
        instance_ids: &'a [InstanceId],
    ) -> FleetFuture<'a, ActivityId> {
        Box::pin(async move {
            let mut request = params(&[
                ("RegionId", group.region.as_str()),
                ("ScalingGroupId", group.id.as_str()),
            ]);
            for (index, id) in instance_ids.iter().enumerate() {
                request.insert(format!("InstanceIds.{}", index + 1), id.to_string());
            }
            let response: ActivityStartedResponse =
                self.call("RemoveInstances", &request).await?;
            Ok(ActivityId::new(response.scaling_activity_id))
        })
    }

    fn activity_status<'a>(
        &'a self,
        group: &'a ScalingGroupRef,
        activity: &'a ActivityId,
    ) -> FleetFuture<'a, bool> {
        Box::pin(async move {
            let response: DescribeScalingActivitiesResponse = self
                .call(
                    "DescribeScalingActivities",
                    &params(&[
                        ("RegionId", group.region.as_str()),
                        ("ScalingGroupId", group.id.as_str()),
                        ("ScalingActivityIds.1", activity.as_str()),
                    ]),
                )
                .await?;
            activity_done(activity, &response)
        })
    }
}
