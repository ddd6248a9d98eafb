//! One session: one transport, one kernel, one registry, one desk.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::json;
use uuid::Uuid;

use warden_approval::{ApprovalDesk, DeskConfig};
use warden_broker::{BrokerConfig, MessageBroker};
use warden_kernel::{KernelConfig, LocalKernel, Sandbox, SharedKernel};
use warden_protocol::{
    DecideApprovalParams, DecisionAck, ErrorCode, ExecuteCodeParams, ExecutionResult,
    GetHistoryParams, GetStackTraceParams, GetVariablesParams, HistoryData, HistoryEntry,
    InspectVariableParams, RequestId, SessionId, StackTraceData, TimestampMs, ToolInvocation,
    Transport, WireEnvelope, WireError, WirePayload,
};
use warden_tool::ToolContext;

use crate::error::ServiceError;
use crate::gateway::Gateway;
use crate::tools::default_registry;

/// Configuration for one session attachment.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session id; a fresh UUID when absent.
    pub session_id: Option<String>,
    /// Broker tunables (per-request timeout).
    pub broker: BrokerConfig,
    /// Approval desk tunables (approval timeout).
    pub desk: DeskConfig,
    /// Kernel tunables (preview length, value bound, execution timeout).
    pub kernel: KernelConfig,
    /// Root directory for the file tools; without one, no file tools are
    /// registered.
    pub workspace_root: Option<PathBuf>,
    /// How many executions the history ring remembers.
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            broker: BrokerConfig::default(),
            desk: DeskConfig::default(),
            kernel: KernelConfig::default(),
            workspace_root: None,
            history_limit: 256,
        }
    }
}

/// The per-session composition of broker, gateway, desk, and kernel.
///
/// [`attach`](Self::attach) wires everything to a transport and spawns the
/// background tasks; the service then answers requests until the channel
/// closes, at which point every pending request fails `SESSION_CLOSED`,
/// every awaiting case times out, and the kernel is marked dead. An
/// execution already in flight finishes; its result is dropped.
#[derive(Clone)]
pub struct SessionService {
    session_id: SessionId,
    broker: MessageBroker,
    gateway: Arc<Gateway>,
    kernel: SharedKernel,
    desk: ApprovalDesk,
    ctx: ToolContext,
    history: Arc<Mutex<VecDeque<HistoryEntry>>>,
    history_limit: usize,
}

impl SessionService {
    /// Attach a new session to a transport and start serving it.
    pub fn attach(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let session_id = SessionId::new(
            config
                .session_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        );
        let kernel = SharedKernel::new(LocalKernel::with_config(config.kernel));
        let (desk, mut events_rx) = ApprovalDesk::new(config.desk);
        let (broker, mut handler_rx) = MessageBroker::start(transport, config.broker);
        let registry = Arc::new(default_registry(kernel.clone(), config.workspace_root));
        let gateway = Arc::new(Gateway::new(registry, desk.clone()));

        let service = Self {
            ctx: ToolContext::new(session_id.clone()),
            session_id,
            broker: broker.clone(),
            gateway,
            kernel,
            desk,
            history: Arc::new(Mutex::new(VecDeque::new())),
            history_limit: config.history_limit,
        };
        tracing::info!(session_id = %service.session_id, "session attached");

        // Approval events flow out-of-band to the client.
        let event_broker = broker.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if event_broker.notify(event).await.is_err() {
                    break;
                }
            }
        });

        // Each inbound request is answered on its own task, so a gated
        // dispatch can suspend while the decision request comes through.
        let loop_service = service.clone();
        tokio::spawn(async move {
            while let Some(envelope) = handler_rx.recv().await {
                let service = loop_service.clone();
                tokio::spawn(async move {
                    service.handle_envelope(envelope).await;
                });
            }
            loop_service.teardown();
        });

        service
    }

    /// This session's id.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The gateway, for reasoning layers that produce invocations
    /// directly instead of wire requests.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// The session kernel handle.
    pub fn kernel(&self) -> &SharedKernel {
        &self.kernel
    }

    /// The approval desk.
    pub fn desk(&self) -> &ApprovalDesk {
        &self.desk
    }

    /// Dispatch an invocation from the reasoning layer through the
    /// gateway, with this session's context.
    pub async fn dispatch(
        &self,
        invocation: ToolInvocation,
    ) -> Result<serde_json::Value, ServiceError> {
        self.gateway.dispatch(invocation, &self.ctx).await
    }

    /// Close the session locally: stop the transport and cascade teardown.
    pub async fn close(&self) {
        self.broker.close().await;
        self.teardown();
    }

    fn teardown(&self) {
        tracing::info!(session_id = %self.session_id, "session closed");
        self.ctx.cancellation_token.cancel();
        self.desk.close();
        self.kernel.shutdown();
    }

    async fn handle_envelope(&self, envelope: WireEnvelope) {
        let request_id = envelope.id.clone();
        let kind = envelope.payload.kind();
        tracing::debug!(request_id = %request_id, kind, "handling request");

        let result = match envelope.payload {
            WirePayload::GetVariables { params } => self.get_variables(params).await,
            WirePayload::InspectVariable { params } => self.inspect_variable(params).await,
            WirePayload::ExecuteCode { params } => {
                self.execute_code(request_id.clone(), params).await
            }
            WirePayload::GetKernelInfo => self.kernel_info().await,
            WirePayload::GetHistory { params } => self.get_history(params),
            WirePayload::GetStackTrace { params } => self.stack_trace(params).await,
            WirePayload::DecideApproval { params } => self.decide_approval(params),
            WirePayload::Response(_) | WirePayload::ApprovalRequest(_) => Err(
                ServiceError::Invalid(format!("unexpected message type: {kind}")),
            ),
        };

        let outcome = match result {
            Ok(data) => self.broker.respond_ok(request_id.clone(), data).await,
            Err(e) => {
                tracing::debug!(request_id = %request_id, error = %e, "request failed");
                self.broker.respond_err(request_id.clone(), e.to_wire()).await
            }
        };
        if let Err(e) = outcome {
            // The caller may have hung up while we worked; the result is
            // dropped, which is exactly the contract.
            tracing::debug!(request_id = %request_id, error = %e, "response not delivered");
        }
    }

    async fn get_variables(
        &self,
        params: GetVariablesParams,
    ) -> Result<serde_json::Value, ServiceError> {
        let invocation = ToolInvocation::new(
            "get_variables",
            serde_json::to_value(&params).unwrap_or_else(|_| json!({})),
        );
        self.gateway.dispatch(invocation, &self.ctx).await
    }

    async fn inspect_variable(
        &self,
        params: InspectVariableParams,
    ) -> Result<serde_json::Value, ServiceError> {
        let invocation = ToolInvocation::new(
            "inspect_variable",
            serde_json::to_value(&params).unwrap_or_else(|_| json!({})),
        );
        self.gateway.dispatch(invocation, &self.ctx).await
    }

    async fn kernel_info(&self) -> Result<serde_json::Value, ServiceError> {
        let invocation = ToolInvocation::new("kernel_info", json!({}));
        self.gateway.dispatch(invocation, &self.ctx).await
    }

    async fn execute_code(
        &self,
        request_id: RequestId,
        params: ExecuteCodeParams,
    ) -> Result<serde_json::Value, ServiceError> {
        let invocation = ToolInvocation::new(
            "execute_code",
            serde_json::to_value(&params).unwrap_or_else(|_| json!({})),
        )
        .with_origin(request_id);

        let data = self.gateway.dispatch(invocation, &self.ctx).await?;

        // The gated path hands back the full execution record; remember it
        // and decide how it surfaces.
        let result: ExecutionResult = serde_json::from_value(data.clone())
            .map_err(|e| ServiceError::Invalid(format!("malformed execution result: {e}")))?;
        self.record_history(&params.code, &result);

        if result.success {
            Ok(data)
        } else {
            let error = result.error.as_ref();
            let code = match error.map(|e| e.kind.as_str()) {
                Some("SyntaxError") => ErrorCode::SyntaxError,
                Some("TimeoutError") => ErrorCode::ExecutionTimeout,
                _ => ErrorCode::ExecutionError,
            };
            let message = error
                .map(|e| format!("{}: {}", e.kind, e.message))
                .unwrap_or_else(|| "execution failed".to_string());
            let details = serde_json::to_value(error).unwrap_or(serde_json::Value::Null);
            Err(ServiceError::Wire(
                WireError::new(code, message).with_details(details),
            ))
        }
    }

    fn record_history(&self, code: &str, result: &ExecutionResult) {
        let mut history = self.history.lock().expect("history lock poisoned");
        history.push_back(HistoryEntry {
            execution_count: result.execution_count,
            timestamp: TimestampMs::now(),
            input: code.to_string(),
            success: result.success,
            outputs: result.outputs.clone(),
        });
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    fn get_history(&self, params: GetHistoryParams) -> Result<serde_json::Value, ServiceError> {
        let history = self.history.lock().expect("history lock poisoned");
        let total_count = history.len();

        let window = history
            .iter()
            .skip(total_count.saturating_sub(params.n_items));
        let items: Vec<HistoryEntry> = match &params.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                window
                    .filter(|entry| entry.input.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            }
            None => window.cloned().collect(),
        };

        serde_json::to_value(HistoryData { items, total_count })
            .map_err(|e| ServiceError::Invalid(e.to_string()))
    }

    async fn stack_trace(
        &self,
        params: GetStackTraceParams,
    ) -> Result<serde_json::Value, ServiceError> {
        let frames = self
            .kernel
            .stack_trace(params.include_locals, params.max_frames)
            .await?;
        let exception = self.kernel.last_error().await?;
        let is_active = exception.is_some();
        serde_json::to_value(StackTraceData {
            frames,
            exception,
            is_active,
        })
        .map_err(|e| ServiceError::Invalid(e.to_string()))
    }

    fn decide_approval(
        &self,
        params: DecideApprovalParams,
    ) -> Result<serde_json::Value, ServiceError> {
        self.desk.decide(&params.case_id, params.decision)?;
        serde_json::to_value(DecisionAck {
            case_id: params.case_id,
            accepted: true,
        })
        .map_err(|e| ServiceError::Invalid(e.to_string()))
    }
}
