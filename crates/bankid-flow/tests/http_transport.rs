//! HTTP transport tests against a mock provider endpoint.

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bankid_flow::action::{UserAuthData, VisibleDataFormat};
use bankid_flow::transport::InitiatePayload;
use bankid_flow::{
    ApiErrorCode, CollectResponse, Config, Error, HttpTransport, OrderKind, PendingHint, Transport,
};
use mockito::Matcher;
use serde_json::json;
use url::Url;

fn transport_for(server: &mockito::ServerGuard) -> Result<HttpTransport> {
    let config = Config::new(Url::parse(&server.url())?);
    Ok(HttpTransport::new(&config)?)
}

#[tokio::test]
async fn initiate_posts_the_wire_payload() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rp/v6.0/auth")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "endUserIp": "192.168.1.1",
            "userVisibleData": BASE64.encode("Log in"),
            "userVisibleDataFormat": "simpleMarkdownV1",
        })))
        .with_status(200)
        .with_body(
            json!({
                "orderRef": "131daac9-16c6-4618-beb0-365768f37288",
                "autoStartToken": "7c40b5c9-fa74-49cf-b98c-bfe651f9a7c6",
                "qrStartToken": "67df3917-fa0d-44e5-b327-edcc928297f8",
                "qrStartSecret": "d28db9a7-4cde-429e-a983-359be676944c",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let transport = transport_for(&server)?;
    let payload = InitiatePayload::auth(
        "192.168.1.1",
        None,
        &UserAuthData {
            visible: Some("Log in".to_owned()),
            non_visible: None,
            visible_format: Some(VisibleDataFormat::SimpleMarkdownV1),
        },
    )?;
    let response = transport.initiate(OrderKind::Auth, &payload).await?;
    assert_eq!(response.order_ref, "131daac9-16c6-4618-beb0-365768f37288");
    assert_eq!(
        response.qr_start_secret,
        "d28db9a7-4cde-429e-a983-359be676944c"
    );
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn collect_parses_a_pending_response() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rp/v6.0/collect")
        .match_body(Matcher::Json(json!({"orderRef": "ref-1"})))
        .with_status(200)
        .with_body(
            json!({
                "orderRef": "ref-1",
                "status": "pending",
                "hintCode": "userSign",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let transport = transport_for(&server)?;
    let response = transport.collect("ref-1").await?;
    assert_eq!(
        response,
        CollectResponse::Pending {
            order_ref: "ref-1".to_owned(),
            hint_code: PendingHint::UserSign,
        }
    );
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn provider_errors_map_to_typed_codes() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/rp/v6.0/collect")
        .with_status(400)
        .with_body(
            json!({
                "errorCode": "invalidParameters",
                "details": "No such order",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let transport = transport_for(&server)?;
    let err = transport.collect("ref-1").await.unwrap_err();
    match err {
        Error::Api {
            code,
            status,
            details,
        } => {
            assert_eq!(code, ApiErrorCode::InvalidParameters);
            assert_eq!(status, 400);
            assert_eq!(details.as_deref(), Some("No such order"));
        }
        other => panic!("expected api error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unparsable_error_bodies_collapse_to_unknown() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/rp/v6.0/collect")
        .with_status(503)
        .with_body("upstream gateway timeout")
        .create_async()
        .await;

    let transport = transport_for(&server)?;
    let err = transport.collect("ref-1").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Api {
            code: ApiErrorCode::Unknown,
            status: 503,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn cancel_discards_the_response_body() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rp/v6.0/cancel")
        .match_body(Matcher::Json(json!({"orderRef": "ref-1"})))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let transport = transport_for(&server)?;
    transport.cancel("ref-1").await?;
    mock.assert_async().await;
    Ok(())
}
