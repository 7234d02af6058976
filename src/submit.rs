//! Order submission
//!
//! The final step hands the completed form to the backend and gets back the
//! id of the created order. The wire body keeps the backend's historical
//! encodings: `observed` travels as `"0"`/`"1"`, the communication flags as
//! JSON booleans.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use order_types::FormState;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::WizardConfig;
use crate::error::{Result, WizardError};

/// File attached to the order (e.g. a signed consent form)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Order body as the submission endpoint expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub ssn: String,
    pub dob: String,
    pub phone1: String,
    pub phone2: String,
    pub address: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub company_id: String,
    pub package_name: String,
    pub order_reason_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dot_agency: Option<String>,
    pub observed: &'static str,
    pub email: String,
    pub cc_email: String,
    pub send_link: bool,
    pub donor_pass: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescheduled_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPayload {
    pub file_name: String,
    pub content_type: String,
    /// Base64 (standard alphabet) file content
    pub data: String,
}

impl OrderRequest {
    pub fn from_form(
        form: &FormState,
        attachment: Option<&Attachment>,
        rescheduled_from: Option<&str>,
    ) -> Self {
        Self {
            first_name: form.first_name.clone(),
            middle_name: form.middle_name.clone(),
            last_name: form.last_name.clone(),
            ssn: form.ssn_or_eid.clone(),
            dob: form.dob.clone(),
            phone1: form.phone1.clone(),
            phone2: form.phone2.clone(),
            address: form.address.clone(),
            address2: form.address2.clone(),
            city: form.city.clone(),
            state: form.state.clone(),
            zip: form.zip.clone(),
            company_id: form
                .company_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            package_name: form.package_name.clone().unwrap_or_default(),
            order_reason_name: form.order_reason_name.clone().unwrap_or_default(),
            // only meaningful for DOT packages
            dot_agency: form.dot_agency.clone().filter(|_| form.requires_dot_agency()),
            observed: if form.observed { "1" } else { "0" },
            email: form.email.clone(),
            cc_email: form.cc_email.clone(),
            send_link: form.send_scheduling_link,
            donor_pass: form.donor_pass,
            rescheduled_from: rescheduled_from.map(str::to_string),
            attachment: attachment.map(|a| AttachmentPayload {
                file_name: a.file_name.clone(),
                content_type: a.content_type.clone(),
                data: B64.encode(&a.bytes),
            }),
        }
    }
}

/// Backend that accepts completed orders
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    /// Submit the order and return the id of the created result
    async fn submit(&self, order: &OrderRequest) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    data: SubmitResponseData,
}

#[derive(Debug, Deserialize)]
struct SubmitResponseData {
    id: serde_json::Value,
}

pub struct HttpOrderSubmitter {
    http: Client,
    url: Url,
    auth_token: Option<String>,
}

impl HttpOrderSubmitter {
    pub fn new(http: Client, url: Url, auth_token: Option<String>) -> Self {
        Self {
            http,
            url,
            auth_token,
        }
    }

    pub fn from_config(http: Client, config: &WizardConfig) -> Result<Self> {
        Ok(Self::new(
            http,
            config.endpoint_url(&config.endpoints.submit_order)?,
            config.auth_token.clone(),
        ))
    }
}

#[async_trait]
impl OrderSubmitter for HttpOrderSubmitter {
    async fn submit(&self, order: &OrderRequest) -> Result<String> {
        let mut request = self.http.post(self.url.clone()).json(order);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WizardError::Status {
                endpoint: self.url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body: SubmitResponse = response.json().await?;
        match body.data.id {
            serde_json::Value::String(id) if !id.is_empty() => Ok(id),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(WizardError::Submission(format!(
                "response carried no order id: {}",
                other
            ))),
        }
    }
}
