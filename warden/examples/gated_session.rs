//! A complete propose → approve → execute round trip over an in-memory
//! channel, playing both sides of the wire.
//!
//! Run with: `cargo run -p warden --example gated_session`

use std::sync::Arc;

use warden::{SessionConfig, SessionService};
use warden_protocol::test_utils::duplex;
use warden_protocol::{
    ApprovalDecision, DecideApprovalParams, ExecuteCodeParams, ExecuteOptions,
    InspectVariableParams, RequestId, Transport, WireEnvelope, WirePayload,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (client, server) = duplex(64);
    let _service = SessionService::attach(Arc::new(server), SessionConfig::default());

    // Propose an execution; the backend gates it behind approval.
    client
        .send(WireEnvelope::new(
            RequestId::new("req-1"),
            WirePayload::ExecuteCode {
                params: ExecuteCodeParams {
                    code: "x = 40 + 2\nprint(x)".to_string(),
                    options: ExecuteOptions::default(),
                },
            },
        ))
        .await
        .expect("send execute_code");

    // First inbound message is the approval request event.
    let envelope = client.recv().await.expect("approval event");
    let WirePayload::ApprovalRequest(event) = envelope.payload else {
        panic!("expected an approval_request, got {:?}", envelope.payload);
    };
    println!("approval requested: {}", event.description);

    // Approve it.
    client
        .send(WireEnvelope::new(
            RequestId::new("req-2"),
            WirePayload::DecideApproval {
                params: DecideApprovalParams {
                    case_id: event.case_id,
                    decision: ApprovalDecision::Approve,
                },
            },
        ))
        .await
        .expect("send decision");

    // Drain the decision ack and the execution result, then inspect x.
    for _ in 0..2 {
        let envelope = client.recv().await.expect("response");
        if let WirePayload::Response(body) = envelope.payload {
            println!(
                "response to {}: success={} data={:?}",
                body.request_id, body.success, body.data
            );
        }
    }

    client
        .send(WireEnvelope::new(
            RequestId::new("req-3"),
            WirePayload::InspectVariable {
                params: InspectVariableParams {
                    name: "x".to_string(),
                    deep: true,
                },
            },
        ))
        .await
        .expect("send inspect");
    let envelope = client.recv().await.expect("inspect response");
    if let WirePayload::Response(body) = envelope.payload {
        let data = body.data.expect("inspect data");
        println!("x = {}", data["info"]["value"]);
    }
}
