#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared fixtures for cyclos-plugin integration tests

use std::sync::Arc;

use cyclos_plugin::CyclosBackendFactory;
use lokapi_rest::testing::MockTransport;
use lokapi_sdk::{BackendConnection, BackendDescriptor, BackendFactory, Capabilities, FanOutMode};
use serde_json::{Value, json};

pub const HOST: &str = "cyclos.example.org";

pub fn descriptor(owners: &[(&str, Option<&str>)]) -> BackendDescriptor {
    let user_accounts: Vec<Value> = owners
        .iter()
        .map(|(owner, token)| {
            json!({
                "url": format!("https://{HOST}/api"),
                "token": token,
                "owner_id": owner,
            })
        })
        .collect();
    serde_json::from_value(json!({"type": "cyclos", "user_accounts": user_accounts})).unwrap()
}

pub fn backend_with(
    transport: &Arc<MockTransport>,
    owners: &[(&str, Option<&str>)],
    fan_out: FanOutMode,
) -> Arc<dyn BackendConnection> {
    let caps = Capabilities::new(transport.clone()).with_fan_out(fan_out);
    CyclosBackendFactory.create(&descriptor(owners), &caps).unwrap()
}

pub fn backend(transport: &Arc<MockTransport>) -> Arc<dyn BackendConnection> {
    backend_with(
        transport,
        &[("alice", Some("tok-a")), ("bob", Some("tok-b"))],
        FanOutMode::Parallel,
    )
}
