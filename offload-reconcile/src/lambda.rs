//! [`FunctionProvider`] over the Lambda REST API (`2015-03-31`), signed with
//! SigV4 and sent through a blocking `ureq` agent.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use offload_core::config::{Credentials, ProviderConfig};
use offload_core::{
    FunctionConfiguration, FunctionName, FunctionState, LastUpdateStatus, RemoteCode,
    RemoteFunctionState,
};

use crate::error::ReconcileError;
use crate::provider::{CodeLocation, CreateFunctionRequest, FunctionProvider, ProviderError};
use crate::sigv4::{self, SigningParams};

const API_PREFIX: &str = "/2015-03-31/functions";
const SERVICE: &str = "lambda";
const NOT_FOUND_CODE: &str = "ResourceNotFoundException";
/// Provider default when a function reports no ephemeral storage.
const DEFAULT_EPHEMERAL_STORAGE_MB: u32 = 512;

pub struct LambdaProvider {
    endpoint: Url,
    region: String,
    credentials: Credentials,
    offline_status_codes: Vec<u16>,
    agent: ureq::Agent,
}

impl LambdaProvider {
    pub fn new(
        endpoint: &str,
        region: &str,
        credentials: Credentials,
        offline_status_codes: Vec<u16>,
    ) -> Result<Self, ReconcileError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ReconcileError::Config(format!("invalid function endpoint URL '{endpoint}': {e}"))
        })?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(120))
            .timeout_write(Duration::from_secs(120))
            .build();
        Ok(Self {
            endpoint,
            region: region.to_string(),
            credentials,
            offline_status_codes,
            agent,
        })
    }

    /// Build from the `provider` config section. Credentials are required.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ReconcileError> {
        let credentials = config.credentials().ok_or_else(|| {
            ReconcileError::Config(
                "no provider credentials: set provider.access_key_id/secret_access_key or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY"
                    .to_string(),
            )
        })?;
        Self::new(
            &config.endpoint,
            &config.region,
            credentials,
            config.offline_status_codes.clone(),
        )
    }

    fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ureq::Response, ProviderError> {
        let mut url = self.endpoint.clone();
        url.set_path(path);

        let params = SigningParams {
            access_key_id: &self.credentials.access_key_id,
            secret_access_key: &self.credentials.secret_access_key,
            session_token: self.credentials.session_token.as_deref(),
            region: &self.region,
            service: SERVICE,
        };
        let content_type: &[(&str, &str)] = if body.is_some() {
            &[("content-type", "application/json")]
        } else {
            &[]
        };
        let payload = body.as_deref().unwrap_or_default();
        let signed = sigv4::sign(&params, method, &url, content_type, payload, Utc::now())
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let mut request = self.agent.request(method, url.as_str());
        for (name, value) in content_type {
            request = request.set(name, value);
        }
        for (name, value) in &signed {
            request = request.set(name, value);
        }

        let result = match body {
            Some(bytes) => request.send_bytes(&bytes),
            None => request.call(),
        };
        result.map_err(|e| self.classify(e))
    }

    fn send_json<T: Serialize>(
        &self,
        method: &str,
        path: &str,
        body: &T,
    ) -> Result<(), ProviderError> {
        let bytes = serde_json::to_vec(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        self.send(method, path, Some(bytes))?;
        Ok(())
    }

    fn classify(&self, err: ureq::Error) -> ProviderError {
        match err {
            ureq::Error::Status(status, resp) => {
                let header_code = resp.header("x-amzn-errortype").map(str::to_string);
                let body = resp.into_string().unwrap_or_default();
                classify_status(status, header_code.as_deref(), &body, &self.offline_status_codes)
            }
            ureq::Error::Transport(transport) => ProviderError::Transport(transport.to_string()),
        }
    }
}

fn function_path(name: &FunctionName) -> String {
    format!("{API_PREFIX}/{name}")
}

impl FunctionProvider for LambdaProvider {
    fn get_function(&self, name: &FunctionName) -> Result<RemoteFunctionState, ProviderError> {
        let resp = self.send("GET", &function_path(name), None)?;
        let body: GetFunctionResponse = resp
            .into_json()
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(body.into_state())
    }

    fn create_function(&self, request: &CreateFunctionRequest) -> Result<(), ProviderError> {
        let (package_type, runtime, handler) = match &request.runtime {
            Some(settings) => ("Zip", Some(settings.runtime.as_str()), Some(settings.handler.as_str())),
            None => ("Image", None, None),
        };
        let body = CreateFunctionBody {
            function_name: request.name.as_ref(),
            role: &request.configuration.role_arn,
            memory_size: request.configuration.memory_mb,
            ephemeral_storage: EphemeralStorage {
                size: request.configuration.ephemeral_storage_mb,
            },
            package_type,
            code: CodeBody::from(&request.code),
            runtime,
            handler,
        };
        self.send_json("POST", API_PREFIX, &body)
    }

    fn update_configuration(
        &self,
        name: &FunctionName,
        configuration: &FunctionConfiguration,
    ) -> Result<(), ProviderError> {
        let body = UpdateConfigurationBody {
            role: &configuration.role_arn,
            memory_size: configuration.memory_mb,
            ephemeral_storage: EphemeralStorage {
                size: configuration.ephemeral_storage_mb,
            },
        };
        self.send_json("PUT", &format!("{}/configuration", function_path(name)), &body)
    }

    fn update_code(&self, name: &FunctionName, code: &CodeLocation) -> Result<(), ProviderError> {
        self.send_json(
            "PUT",
            &format!("{}/code", function_path(name)),
            &CodeBody::from(code),
        )
    }
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Map an HTTP failure onto a [`ProviderError`] kind.
///
/// `header_code` is the `x-amzn-ErrorType` header (`Code:uri` form accepted).
/// Not-found is a 404 that is either uncoded or `ResourceNotFoundException`;
/// any status in `offline_status_codes` is [`ProviderError::Offline`].
pub fn classify_status(
    status: u16,
    header_code: Option<&str>,
    body: &str,
    offline_status_codes: &[u16],
) -> ProviderError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let field = |names: &[&str]| {
        parsed.as_ref().and_then(|value| {
            names
                .iter()
                .find_map(|name| value.get(*name).and_then(|v| v.as_str()).map(str::to_string))
        })
    };

    let code = header_code
        .map(|h| h.split(':').next().unwrap_or(h).to_string())
        .or_else(|| field(&["__type", "code", "Code"]))
        .map(|c| c.rsplit('#').next().unwrap_or(&c).to_string())
        .filter(|c| !c.is_empty());
    let message = field(&["Message", "message"]).unwrap_or_else(|| body.trim().to_string());

    if status == 404 && code.as_deref().map_or(true, |c| c == NOT_FOUND_CODE) {
        return ProviderError::NotFound;
    }
    if offline_status_codes.contains(&status) {
        return ProviderError::Offline { status };
    }
    ProviderError::Api {
        status,
        code,
        message,
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EphemeralStorage {
    size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CodeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_uri: Option<&'a str>,
    #[serde(rename = "S3Bucket", skip_serializing_if = "Option::is_none")]
    s3_bucket: Option<&'a str>,
    #[serde(rename = "S3Key", skip_serializing_if = "Option::is_none")]
    s3_key: Option<&'a str>,
}

impl<'a> From<&'a CodeLocation> for CodeBody<'a> {
    fn from(code: &'a CodeLocation) -> Self {
        match code {
            CodeLocation::Image { uri } => CodeBody {
                image_uri: Some(uri.as_str()),
                s3_bucket: None,
                s3_key: None,
            },
            CodeLocation::Archive(location) => CodeBody {
                image_uri: None,
                s3_bucket: Some(location.bucket.as_str()),
                s3_key: Some(location.key.as_str()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateFunctionBody<'a> {
    function_name: &'a str,
    role: &'a str,
    memory_size: u32,
    ephemeral_storage: EphemeralStorage,
    package_type: &'a str,
    code: CodeBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    handler: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateConfigurationBody<'a> {
    role: &'a str,
    memory_size: u32,
    ephemeral_storage: EphemeralStorage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetFunctionResponse {
    configuration: RemoteConfiguration,
    #[serde(default)]
    code: Option<RemoteCodeLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteConfiguration {
    memory_size: u32,
    role: String,
    #[serde(default)]
    ephemeral_storage: Option<EphemeralStorage>,
    #[serde(default)]
    state: Option<FunctionState>,
    #[serde(default)]
    state_reason: Option<String>,
    #[serde(default)]
    last_update_status: Option<LastUpdateStatus>,
    #[serde(default)]
    last_update_status_reason: Option<String>,
    #[serde(default)]
    code_sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteCodeLocation {
    #[serde(default)]
    image_uri: Option<String>,
}

impl GetFunctionResponse {
    fn into_state(self) -> RemoteFunctionState {
        let config = self.configuration;
        // Functions created before state tracking report neither field.
        let state = config.state.unwrap_or(FunctionState::Active);
        let last_update = config.last_update_status.unwrap_or(LastUpdateStatus::Successful);
        let reason = match (state, last_update) {
            (FunctionState::Failed, _) => config.state_reason,
            (_, LastUpdateStatus::Failed) => config.last_update_status_reason,
            _ => None,
        };
        RemoteFunctionState {
            configuration: FunctionConfiguration {
                memory_mb: config.memory_size,
                role_arn: config.role,
                ephemeral_storage_mb: config
                    .ephemeral_storage
                    .map_or(DEFAULT_EPHEMERAL_STORAGE_MB, |s| s.size),
            },
            code: RemoteCode {
                image_uri: self.code.and_then(|c| c.image_uri),
                code_sha256: config.code_sha256,
            },
            state,
            last_update,
            reason,
        }
    }
}
