//! Property-based tests: serde roundtrip for the wire types.

use proptest::prelude::*;
use warden_protocol::*;

fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}".prop_map(|s| s)
}

fn arb_decision() -> impl Strategy<Value = ApprovalDecision> {
    prop_oneof![Just(ApprovalDecision::Approve), Just(ApprovalDecision::Reject)]
}

fn arb_sort() -> impl Strategy<Value = SortSpec> {
    (
        prop_oneof![Just(SortBy::Name), Just(SortBy::Type), Just(SortBy::Size)],
        prop_oneof![Just(SortOrder::Asc), Just(SortOrder::Desc)],
    )
        .prop_map(|(by, order)| SortSpec { by, order })
}

fn arb_filter() -> impl Strategy<Value = VariableFilter> {
    (
        proptest::collection::vec(arb_identifier(), 0..3),
        proptest::option::of(arb_identifier()),
        any::<bool>(),
    )
        .prop_map(|(types, pattern, exclude_private)| VariableFilter {
            types,
            pattern,
            exclude_private,
        })
}

fn arb_fragment() -> impl Strategy<Value = OutputFragment> {
    prop_oneof![
        (prop_oneof![Just("stdout"), Just("stderr")], ".*").prop_map(|(name, text)| {
            OutputFragment::Stream {
                name: name.to_string(),
                text,
            }
        }),
        (".*", 0u64..10_000).prop_map(|(text, execution_count)| OutputFragment::ExecuteResult {
            text,
            execution_count,
        }),
    ]
}

fn arb_request_payload() -> impl Strategy<Value = WirePayload> {
    prop_oneof![
        (arb_filter(), arb_sort()).prop_map(|(filter, sort)| WirePayload::GetVariables {
            params: GetVariablesParams { filter, sort }
        }),
        (arb_identifier(), any::<bool>()).prop_map(|(name, deep)| {
            WirePayload::InspectVariable {
                params: InspectVariableParams { name, deep },
            }
        }),
        ".*".prop_map(|code| WirePayload::ExecuteCode {
            params: ExecuteCodeParams {
                code,
                options: ExecuteOptions::default(),
            }
        }),
        Just(WirePayload::GetKernelInfo),
        (1usize..100, proptest::option::of(arb_identifier())).prop_map(|(n_items, search)| {
            WirePayload::GetHistory {
                params: GetHistoryParams { n_items, search },
            }
        }),
        (arb_identifier(), arb_decision()).prop_map(|(case, decision)| {
            WirePayload::DecideApproval {
                params: DecideApprovalParams {
                    case_id: CaseId::new(case),
                    decision,
                },
            }
        }),
    ]
}

proptest! {
    #[test]
    fn envelope_serde_roundtrip(
        id in arb_identifier(),
        ts in 0i64..2_000_000_000_000,
        payload in arb_request_payload(),
    ) {
        let env = WireEnvelope {
            id: RequestId::new(id),
            timestamp: TimestampMs::from_millis(ts),
            version: PROTOCOL_VERSION.to_string(),
            payload,
        };
        let json = serde_json::to_string(&env).unwrap();
        let back: WireEnvelope = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, env);
    }

    #[test]
    fn fragment_serde_roundtrip(fragment in arb_fragment()) {
        let json = serde_json::to_string(&fragment).unwrap();
        let back: OutputFragment = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, fragment);
    }

    #[test]
    fn wire_error_roundtrip(msg in ".*") {
        let err = WireError::new(ErrorCode::ExecutionError, msg);
        let json = serde_json::to_string(&err).unwrap();
        let back: WireError = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, err);
    }
}
