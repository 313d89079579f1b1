use super::ResourceProvider;
use crate::cleanup::ResourceName;
use crate::common::{ProviderError, ProviderErrorKind};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatchlogs::Client;
use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::time::Duration;

const DESCRIBE_PAGE_SIZE: i32 = 50;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 2;

/// CloudWatch Logs log groups as cleanup resources.
///
/// Listing walks `DescribeLogGroups` page by page; deletion is
/// `DeleteLogGroup`. AWS error codes are mapped onto [`ProviderErrorKind`] so
/// that each failed deletion says whether the group was already gone, access
/// was denied or the account was throttled.
#[derive(Debug, Clone)]
pub struct CloudWatchLogsProvider {
    client: Client,
    region: Option<String>,
}

impl CloudWatchLogsProvider {
    /// Build a client from the standard AWS environment (profile, env vars,
    /// instance metadata) with short timeouts and a single retry.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(CONNECT_TIMEOUT)
                    .read_timeout(READ_TIMEOUT)
                    .build(),
            );

        if let Some(region) = region.clone() {
            loader = loader.region(Region::new(region));
        }

        let sdk_config = loader.load().await;
        let region = sdk_config.region().map(|r| r.to_string()).or(region);
        log::debug!("CloudWatch Logs client configured for region {region:?}");

        Self {
            client: Client::new(&sdk_config),
            region,
        }
    }

    pub fn new(client: Client) -> Self {
        Self {
            client,
            region: None,
        }
    }
}

#[async_trait]
impl ResourceProvider for CloudWatchLogsProvider {
    fn describe(&self) -> String {
        match &self.region {
            Some(region) => format!("cloudwatch-logs ({region})"),
            None => "cloudwatch-logs".to_string(),
        }
    }

    async fn list_all(&self) -> Result<Vec<ResourceName>, ProviderError> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;
        let mut page = 0usize;

        loop {
            page += 1;
            let response = self
                .client
                .describe_log_groups()
                .limit(DESCRIBE_PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    log::error!("DescribeLogGroups failed on page {page}");
                    classify_sdk_error(e)
                })?;

            let before = names.len();
            names.extend(
                response
                    .log_groups()
                    .iter()
                    .filter_map(|group| group.log_group_name())
                    .map(ResourceName::from),
            );
            log::debug!(
                "Page {page}: {} log groups, {} total so far",
                names.len() - before,
                names.len()
            );

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        log::info!("Listed {} log groups in {page} pages", names.len());
        Ok(names)
    }

    async fn delete_one(&self, name: &ResourceName) -> Result<(), ProviderError> {
        self.client
            .delete_log_group()
            .log_group_name(name.as_str())
            .send()
            .await
            .map(|_| ())
            .map_err(classify_sdk_error)
    }
}

fn classify_sdk_error<E, R>(error: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let kind = match &error {
        SdkError::TimeoutError(_) => ProviderErrorKind::Timeout,
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => ProviderErrorKind::Transport,
        SdkError::ServiceError(service) => kind_from_code(service.err().code()),
        _ => ProviderErrorKind::Other,
    };
    ProviderError::new(kind, DisplayErrorContext(&error).to_string())
}

/// Map a CloudWatch Logs error code onto a provider error kind
pub(crate) fn kind_from_code(code: Option<&str>) -> ProviderErrorKind {
    match code {
        Some("ResourceNotFoundException") => ProviderErrorKind::NotFound,
        Some("AccessDeniedException" | "UnrecognizedClientException" | "ExpiredTokenException") => {
            ProviderErrorKind::PermissionDenied
        }
        Some("ThrottlingException" | "LimitExceededException" | "TooManyRequestsException") => {
            ProviderErrorKind::Throttled
        }
        Some("ServiceUnavailableException") => ProviderErrorKind::Transport,
        _ => ProviderErrorKind::Other,
    }
}
