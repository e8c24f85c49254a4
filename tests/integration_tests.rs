//! End-to-end tests for the pair-room service over real sockets

mod fixtures;

use async_tungstenite::tokio::connect_async;
use fixtures::*;
use pair_room::config::FleetSettings;
use pair_room::fleet::{FleetClaimer, HttpFleetClient, StaticFleetClaimer};
use pair_room::service::login;
use pair_room::types::{ServerAllocation, MATCH_FOUND_NOTICE, NO_SERVER_NOTICE};
use std::sync::Arc;
use std::time::Duration;

fn game_server() -> ServerAllocation {
    ServerAllocation::new("10.0.0.1", "default", 7777)
}

#[tokio::test]
async fn test_pair_receives_address_and_is_closed() {
    let claimer = Arc::new(StaticFleetClaimer::always(game_server()));
    let (mut app, addr) = start_service(claimer.clone()).await;
    let registry = app.registry();

    let (mut first, _) = connect_async(ws_url(addr)).await.unwrap();
    assert!(wait_until(|| registry.len() == 1).await);
    let (mut second, _) = connect_async(ws_url(addr)).await.unwrap();

    for client in [&mut first, &mut second] {
        assert_eq!(
            next_event(client).await,
            Some(ClientEvent::Text(MATCH_FOUND_NOTICE.to_string()))
        );
        assert_eq!(
            next_event(client).await,
            Some(ClientEvent::Text("10.0.0.1:7777".to_string()))
        );
        assert_eq!(next_event(client).await, Some(ClientEvent::Closed));
    }

    assert!(wait_until(|| registry.is_empty()).await);
    assert_eq!(claimer.claim_count(), 1);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_no_server_keeps_pair_waiting() {
    let claimer = Arc::new(StaticFleetClaimer::unavailable());
    let (mut app, addr) = start_service(claimer.clone()).await;
    let registry = app.registry();

    let (mut first, _) = connect_async(ws_url(addr)).await.unwrap();
    assert!(wait_until(|| registry.len() == 1).await);
    let (mut second, _) = connect_async(ws_url(addr)).await.unwrap();

    for client in [&mut first, &mut second] {
        assert_eq!(
            next_event(client).await,
            Some(ClientEvent::Text(MATCH_FOUND_NOTICE.to_string()))
        );
        assert_eq!(
            next_event(client).await,
            Some(ClientEvent::Text(NO_SERVER_NOTICE.to_string()))
        );
    }

    assert_eq!(registry.len(), 2);

    // The pair is retried on a later pass
    assert!(wait_until(|| claimer.claim_count() >= 2).await);
    assert_eq!(
        next_event(&mut first).await,
        Some(ClientEvent::Text(MATCH_FOUND_NOTICE.to_string()))
    );

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_single_client_waits_without_claim() {
    let claimer = Arc::new(StaticFleetClaimer::always(game_server()));
    let (mut app, addr) = start_service(claimer.clone()).await;
    let registry = app.registry();

    let (mut client, _) = connect_async(ws_url(addr)).await.unwrap();
    assert!(wait_until(|| registry.len() == 1).await);

    let waited = tokio::time::timeout(Duration::from_millis(200), next_event(&mut client)).await;
    assert!(waited.is_err(), "lone client should not hear anything");
    assert_eq!(claimer.claim_count(), 0);
    assert_eq!(registry.len(), 1);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_odd_client_out_keeps_waiting() {
    let claimer = Arc::new(StaticFleetClaimer::always(game_server()));
    let (mut app, addr) = start_service(claimer.clone()).await;
    let registry = app.registry();

    let (mut first, _) = connect_async(ws_url(addr)).await.unwrap();
    assert!(wait_until(|| registry.len() == 1).await);
    let (mut second, _) = connect_async(ws_url(addr)).await.unwrap();

    for client in [&mut first, &mut second] {
        assert_eq!(
            next_event(client).await,
            Some(ClientEvent::Text(MATCH_FOUND_NOTICE.to_string()))
        );
    }
    assert!(wait_until(|| registry.is_empty()).await);

    let (mut third, _) = connect_async(ws_url(addr)).await.unwrap();
    assert!(wait_until(|| registry.len() == 1).await);

    let waited = tokio::time::timeout(Duration::from_millis(200), next_event(&mut third)).await;
    assert!(waited.is_err());
    assert_eq!(claimer.claim_count(), 1);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_disconnect_is_deregistered() {
    let claimer = Arc::new(StaticFleetClaimer::always(game_server()));
    let (mut app, addr) = start_service(claimer).await;
    let registry = app.registry();

    let (mut client, _) = connect_async(ws_url(addr)).await.unwrap();
    assert!(wait_until(|| registry.len() == 1).await);

    client.close(None).await.unwrap();
    assert!(wait_until(|| registry.is_empty()).await);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_liveness_probe_is_not_registered() {
    let claimer = Arc::new(StaticFleetClaimer::always(game_server()));
    let (mut app, addr) = start_service(claimer).await;

    let response = reqwest::get(format!("http://{}/healthz", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
    assert!(app.registry().is_empty());

    let metrics = reqwest::get(format!("http://{}/metrics", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("pair_room_connections_active"));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pair_served_through_fleet_allocator() {
    let allocator = MockAllocator::default();
    let base_url = allocator.spawn().await;

    let client = Arc::new(
        HttpFleetClient::new(FleetSettings {
            base_url,
            namespace: "bjorn".to_string(),
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            ..FleetSettings::default()
        })
        .unwrap(),
    );
    login(client.as_ref()).await.unwrap();

    let claimer: Arc<dyn FleetClaimer> = client;
    let (mut app, addr) = start_service(claimer).await;
    let registry = app.registry();

    let (mut first, _) = connect_async(ws_url(addr)).await.unwrap();
    assert!(wait_until(|| registry.len() == 1).await);
    let (mut second, _) = connect_async(ws_url(addr)).await.unwrap();

    for client in [&mut first, &mut second] {
        assert_eq!(
            next_event(client).await,
            Some(ClientEvent::Text(MATCH_FOUND_NOTICE.to_string()))
        );
        assert_eq!(
            next_event(client).await,
            Some(ClientEvent::Text("10.0.0.1:7777".to_string()))
        );
    }

    let claims = allocator.claims();
    assert_eq!(claims.len(), 1);
    let (namespace, request) = &claims[0];
    assert_eq!(namespace, "bjorn");
    assert_eq!(request.claim_keys, vec!["pong".to_string()]);
    assert_eq!(request.regions, vec!["us-west-2".to_string()]);
    assert_eq!(request.session_id, "none");

    app.shutdown().await.unwrap();
}
