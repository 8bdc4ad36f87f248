//! Integration tests for the EMT client (wiremock-based)

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use integration_emt::{
    ArrivalsClient, EmtClient, EmtConfig, EmtError, Session, fetch_arrival_times, fetch_lines,
};
use secrecy::ExposeSecret;

const LOGIN: &str = "/v3/mobilitylabs/user/login/";
const WHOAMI: &str = "/v1/mobilitylabs/user/whoami/";
const STOP_DETAIL: &str = "/v1/transport/busemtmad/stops/72/detail/";

fn arrivals(line: &str) -> String {
    format!("/v2/transport/busemtmad/stops/72/arrives/{line}/")
}

fn login_json(token: &str) -> Value {
    json!({
        "code": "00",
        "description": "Token extended",
        "data": [{ "accessToken": token, "tokenSecExpiration": 86400 }]
    })
}

fn stop_detail_json() -> Value {
    json!({
        "code": "00",
        "description": "Data recovered OK",
        "data": [[[{
            "stop": "72",
            "name": "Cibeles-Casa de América",
            "dataLine": [
                {
                    "label": "27",
                    "direction": 1,
                    "header0": "Embajadores",
                    "header1": "Plaza Castilla",
                    "minFreq": "5",
                    "maxFreq": "10"
                },
                {
                    "label": "N1",
                    "direction": "0",
                    "header0": "Cibeles",
                    "header1": "Sanchinarro",
                    "minFreq": 20,
                    "maxFreq": 35
                }
            ]
        }]]]
    })
}

fn arrivals_json(seconds: &[&str]) -> Value {
    let arrive: Vec<Value> = seconds
        .iter()
        .map(|s| json!({ "line": "27", "stop": "72", "estimateArrive": s }))
        .collect();
    json!({
        "code": "00",
        "description": "Data recovered OK",
        "data": [{ "Arrive": arrive, "StopInfo": [] }]
    })
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_json(token)))
        .mount(server)
        .await;
}

async fn mount_stop(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(STOP_DETAIL))
        .respond_with(ResponseTemplate::new(200).set_body_json(stop_detail_json()))
        .mount(server)
        .await;
}

async fn mount_arrivals(server: &MockServer, line: &str, seconds: &[&str]) {
    Mock::given(method("POST"))
        .and(path(arrivals(line)))
        .respond_with(ResponseTemplate::new(200).set_body_json(arrivals_json(seconds)))
        .mount(server)
        .await;
}

async fn connected_client(server: &MockServer) -> EmtClient {
    mount_login(server, "T1").await;
    EmtClient::connect(EmtConfig::for_testing(server.uri()))
        .await
        .unwrap()
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_secs).collect()
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn test_login_stores_token() {
    let server = MockServer::start().await;
    mount_login(&server, "T1").await;

    let session = Session::new(EmtConfig::for_testing(server.uri())).unwrap();
    session.login().await.unwrap();

    let token = session.access_token().unwrap();
    assert_eq!(token.expose_secret(), "T1");
}

#[tokio::test]
async fn test_login_sends_credentials_as_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOGIN))
        .and(header("X-ClientId", "test-client"))
        .and(header("passKey", "test-pass-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_json("T1")))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(EmtConfig::for_testing(server.uri())).unwrap();
    session.login().await.unwrap();
}

#[tokio::test]
async fn test_login_accepts_alternate_success_code() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "01",
            "description": "Token created",
            "data": [{ "accessToken": "fresh" }]
        })))
        .mount(&server)
        .await;

    let session = Session::new(EmtConfig::for_testing(server.uri())).unwrap();
    session.login().await.unwrap();
    assert_eq!(session.access_token().unwrap().expose_secret(), "fresh");
}

#[tokio::test]
async fn test_login_rejected_by_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": "99", "description": "bad creds" })),
        )
        .mount(&server)
        .await;

    let session = Session::new(EmtConfig::for_testing(server.uri())).unwrap();
    let err = session.login().await.unwrap_err();

    assert_eq!(err.server_code(), Some("99"));
    assert!(err.to_string().contains("bad creds"));
    assert!(!session.has_token());
}

#[tokio::test]
async fn test_login_http_error_is_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(503).set_body_string("{\"code\":\"00\"}"))
        .mount(&server)
        .await;

    let session = Session::new(EmtConfig::for_testing(server.uri())).unwrap();
    let err = session.login().await.unwrap_err();

    assert!(matches!(
        err,
        EmtError::Network {
            status: Some(503),
            ..
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_login_success_without_token_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": "00", "data": [] })))
        .mount(&server)
        .await;

    let session = Session::new(EmtConfig::for_testing(server.uri())).unwrap();
    let err = session.login().await.unwrap_err();
    assert!(matches!(err, EmtError::Decode(_)));
}

#[tokio::test]
async fn test_relogin_overwrites_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_json("T1")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_login(&server, "T2").await;

    Mock::given(method("GET"))
        .and(path(WHOAMI))
        .and(header("accessToken", "T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": "02" })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(EmtConfig::for_testing(server.uri())).unwrap();
    session.login().await.unwrap();
    assert_eq!(session.access_token().unwrap().expose_secret(), "T1");

    session.login().await.unwrap();
    assert_eq!(session.access_token().unwrap().expose_secret(), "T2");
    session.is_token_active().await.unwrap();
}

#[tokio::test]
async fn test_token_check_success() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(WHOAMI))
        .and(header("accessToken", "T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "02",
            "description": "Token is active",
            "data": [{ "username": "demo" }]
        })))
        .mount(&server)
        .await;

    client.is_token_active().await.unwrap();
}

#[tokio::test]
async fn test_token_check_rejects_data_success_code() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(WHOAMI))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00",
            "description": "unexpected"
        })))
        .mount(&server)
        .await;

    let err = client.is_token_active().await.unwrap_err();
    assert_eq!(err.server_code(), Some("00"));
}

#[tokio::test]
async fn test_token_check_expired() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(WHOAMI))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "80",
            "description": "Token expired"
        })))
        .mount(&server)
        .await;

    let err = client.is_token_active().await.unwrap_err();
    assert_eq!(err.server_code(), Some("80"));
    assert!(!err.is_retryable());
}

// =============================================================================
// Lines and arrivals
// =============================================================================

#[tokio::test]
async fn test_fetch_lines_in_order() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    mount_stop(&server).await;

    let lines = fetch_lines(client.session(), 72).await.unwrap();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].id(), "27");
    assert_eq!(lines[0].direction(), "Plaza Castilla");
    assert_eq!(lines[0].min_freq(), Duration::from_secs(5 * 60));
    assert_eq!(lines[0].max_freq(), Duration::from_secs(10 * 60));
    assert_eq!(lines[1].id(), "N1");
    assert_eq!(lines[1].direction(), "Cibeles");
    assert!(lines.iter().all(|line| line.arrival_times().is_empty()));
}

#[tokio::test]
async fn test_stop_without_lines() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(STOP_DETAIL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "00",
            "description": "Data recovered OK",
            "data": [[[{ "stop": "72", "dataLine": [] }]]]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let stop = client.get_stop(72).await.unwrap();
    assert_eq!(stop.id(), 72);
    assert!(stop.lines().is_empty());
}

#[tokio::test]
async fn test_fetch_lines_carries_token() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(STOP_DETAIL))
        .and(header("accessToken", "T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stop_detail_json()))
        .expect(1)
        .mount(&server)
        .await;

    fetch_lines(client.session(), 72).await.unwrap();
}

#[tokio::test]
async fn test_fetch_lines_rejected_code() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(STOP_DETAIL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "90",
            "description": "Stop disabled"
        })))
        .mount(&server)
        .await;

    let err = fetch_lines(client.session(), 72).await.unwrap_err();
    assert_eq!(err.server_code(), Some("90"));
}

#[tokio::test]
async fn test_fetch_lines_missing_data_line() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(STOP_DETAIL))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": "00", "data": [[[{}]]] })),
        )
        .mount(&server)
        .await;

    let err = fetch_lines(client.session(), 72).await.unwrap_err();
    assert!(matches!(err, EmtError::Decode(ref msg) if msg.contains("dataLine")));
}

#[tokio::test]
async fn test_fetch_lines_http_error() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(STOP_DETAIL))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetch_lines(client.session(), 72).await.unwrap_err();
    assert_eq!(err.http_status_code(), Some(404));
}

#[tokio::test]
async fn test_fetch_arrival_times_in_order() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    mount_arrivals(&server, "27", &["120", "300"]).await;

    let times = fetch_arrival_times(client.session(), 72, "27").await.unwrap();
    assert_eq!(times, secs(&[120, 300]));
}

#[tokio::test]
async fn test_fetch_arrival_times_sends_fixed_body() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(arrivals("27")))
        .and(header("accessToken", "T1"))
        .and(body_partial_json(json!({
            "cultureInfo": "EN",
            "Text_StopRequired_YN": "Y",
            "Text_EstimationsRequired_YN": "Y",
            "Text_IncidencesRequired_YN": "Y"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(arrivals_json(&["60"])))
        .expect(1)
        .mount(&server)
        .await;

    let times = fetch_arrival_times(client.session(), 72, "27").await.unwrap();
    assert_eq!(times, secs(&[60]));
}

#[tokio::test]
async fn test_fetch_arrival_times_rejected_code() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(arrivals("27")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "81",
            "description": "Line not found"
        })))
        .mount(&server)
        .await;

    let err = fetch_arrival_times(client.session(), 72, "27")
        .await
        .unwrap_err();
    assert_eq!(err.server_code(), Some("81"));
}

// =============================================================================
// Stops
// =============================================================================

#[tokio::test]
async fn test_get_stop_populates_arrivals() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    mount_stop(&server).await;
    mount_arrivals(&server, "27", &["120", "300"]).await;
    mount_arrivals(&server, "N1", &["900"]).await;

    let stop = client.get_stop(72).await.unwrap();

    assert_eq!(stop.id(), 72);
    assert_eq!(stop.lines().len(), 2);
    assert_eq!(stop.lines()[0].arrival_times(), secs(&[120, 300]).as_slice());
    assert_eq!(stop.lines()[1].arrival_times(), secs(&[900]).as_slice());
    assert_eq!(
        stop.line("27").and_then(|line| line.next_arrival()),
        Some(Duration::from_secs(120))
    );
}

#[tokio::test]
async fn test_get_stop_fails_when_any_line_fails() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    mount_stop(&server).await;
    mount_arrivals(&server, "27", &["120"]).await;

    Mock::given(method("POST"))
        .and(path(arrivals("N1")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.get_stop(72).await.unwrap_err();
    assert_eq!(err.http_status_code(), Some(500));
}

#[tokio::test]
async fn test_refresh_arrivals_replaces_and_is_idempotent() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    mount_stop(&server).await;

    Mock::given(method("POST"))
        .and(path(arrivals("27")))
        .respond_with(ResponseTemplate::new(200).set_body_json(arrivals_json(&["120", "300"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_arrivals(&server, "27", &["60"]).await;
    mount_arrivals(&server, "N1", &["900"]).await;

    let mut stop = client.get_stop(72).await.unwrap();
    assert_eq!(stop.lines()[0].arrival_times(), secs(&[120, 300]).as_slice());

    client.refresh_arrivals(&mut stop).await.unwrap();
    let first = stop.clone();
    assert_eq!(stop.lines()[0].arrival_times(), secs(&[60]).as_slice());

    client.refresh_arrivals(&mut stop).await.unwrap();
    assert_eq!(stop, first);
}

#[tokio::test]
async fn test_refresh_arrivals_keeps_earlier_updates_on_failure() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    mount_stop(&server).await;

    Mock::given(method("POST"))
        .and(path(arrivals("27")))
        .respond_with(ResponseTemplate::new(200).set_body_json(arrivals_json(&["120"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_arrivals(&server, "27", &["30"]).await;

    Mock::given(method("POST"))
        .and(path(arrivals("N1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(arrivals_json(&["900"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(arrivals("N1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "98",
            "description": "Service unavailable"
        })))
        .mount(&server)
        .await;

    let mut stop = client.get_stop(72).await.unwrap();
    let err = client.refresh_arrivals(&mut stop).await.unwrap_err();

    assert_eq!(err.server_code(), Some("98"));
    assert_eq!(stop.lines()[0].arrival_times(), secs(&[30]).as_slice());
    assert_eq!(stop.lines()[1].arrival_times(), secs(&[900]).as_slice());
}

#[tokio::test]
async fn test_connect_fails_when_login_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": "99", "description": "bad creds" })),
        )
        .mount(&server)
        .await;

    let result = EmtClient::connect(EmtConfig::for_testing(server.uri())).await;
    assert!(matches!(result, Err(EmtError::Server { ref code, .. }) if code == "99"));
}
