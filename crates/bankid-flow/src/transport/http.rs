//! HTTP transport against the provider's v6.0 API.

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use super::{CollectResponse, CollectWire, InitiatePayload, OrderResponse, Transport};
use crate::config::Config;
use crate::error::{ApiErrorCode, Error};
use crate::order::OrderKind;

const PATH_PREFIX: &str = "rp/v6.0";

/// Production transport over mutually-authenticated HTTPS.
///
/// Certificate material comes opaquely from [`Config`]; the engine never
/// looks at it.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a client from the configured endpoint and certificate material.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let mut builder = Client::builder().use_rustls_tls();
        if let Some(pem) = &config.identity_pem {
            builder = builder.identity(Identity::from_pem(pem)?);
        }
        if let Some(pem) = &config.ca_pem {
            builder = builder.add_root_certificate(Certificate::from_pem(pem)?);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.api_base_url.clone(),
        })
    }

    fn endpoint(&self, component: &str) -> Result<Url, Error> {
        self.base_url
            .join(&format!("{PATH_PREFIX}/{component}"))
            .map_err(|err| Error::Transport(err.to_string()))
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        component: &str,
        body: &T,
    ) -> Result<Response, Error> {
        let response = self
            .client
            .post(self.endpoint(component)?)
            .json(body)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }
}

/// Map a non-success provider response to a typed error; unparsable bodies
/// collapse to [`ApiErrorCode::Unknown`].
async fn api_error(response: Response) -> Error {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ErrorBody {
        #[serde(default)]
        error_code: Option<ApiErrorCode>,
        #[serde(default)]
        details: Option<String>,
    }

    let status = response.status().as_u16();
    match response.json::<ErrorBody>().await {
        Ok(body) => Error::Api {
            code: body.error_code.unwrap_or(ApiErrorCode::Unknown),
            status,
            details: body.details,
        },
        Err(_) => Error::Api {
            code: ApiErrorCode::Unknown,
            status,
            details: None,
        },
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn initiate(
        &self,
        kind: OrderKind,
        payload: &InitiatePayload,
    ) -> Result<OrderResponse, Error> {
        let response = self.post(kind.as_str(), payload).await?;
        Ok(response.json::<OrderResponse>().await?)
    }

    async fn collect(&self, order_ref: &str) -> Result<CollectResponse, Error> {
        let response = self
            .post("collect", &json!({ "orderRef": order_ref }))
            .await?;
        let wire: CollectWire = response.json().await?;
        wire.try_into()
    }

    async fn cancel(&self, order_ref: &str) -> Result<(), Error> {
        self.post("cancel", &json!({ "orderRef": order_ref }))
            .await?;
        Ok(())
    }
}
