use std::net::SocketAddr;
use std::time::Instant;

use proptest::prelude::*;

use tokenring::node::{Action, NodeId, ProtocolEngine};
use tokenring::operation::{OperationChoice, PendingOperation};
use tokenring::settings::Settings;
use tokenring::token::Token;

fn engine_with(id: u32, operation: Option<PendingOperation>) -> ProtocolEngine {
    let listen: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let mut settings = Settings::new(NodeId::new(id), listen, listen);
    settings.operation = match operation {
        Some(op) => OperationChoice::Explicit(op),
        None => OperationChoice::None,
    };
    ProtocolEngine::new(&settings, Instant::now())
}

fn operation_strategy() -> impl Strategy<Value = PendingOperation> {
    prop_oneof![
        (1u64..5_000).prop_map(PendingOperation::withdraw),
        (1u64..5_000).prop_map(PendingOperation::deposit),
    ]
}

proptest! {
    #[test]
    fn test_withdraw_arithmetic_property(balance in 0u64..10_000, amount in 1u64..10_000) {
        let after = PendingOperation::withdraw(amount).apply(balance).balance();
        if balance >= amount {
            prop_assert_eq!(after, balance - amount);
        } else {
            prop_assert_eq!(after, balance);
        }
    }

    #[test]
    fn test_deposit_arithmetic_property(balance in 0u64..1_000_000, amount in 1u64..1_000_000) {
        let after = PendingOperation::deposit(amount).apply(balance).balance();
        prop_assert_eq!(after, balance + amount);
    }

    #[test]
    fn test_wire_format_property(origin in 1u32..1000, balance in any::<u64>(), stop in any::<bool>()) {
        let token = Token { origin: NodeId::new(origin), balance, stop };
        let wire = token.to_wire();
        prop_assert!(wire.starts_with("TOKEN:"));
        prop_assert_eq!(wire.ends_with(":STOP"), stop);
        prop_assert_eq!(wire.parse::<Token>().unwrap(), token);
    }

    #[test]
    fn test_ring_circuit_property(
        ops in proptest::collection::vec(proptest::option::of(operation_strategy()), 1..8),
        start in 0u64..5_000,
    ) {
        // Node 1 is the authority; the generated ops belong to nodes 2..=N
        let mut nodes: Vec<ProtocolEngine> = ops
            .iter()
            .enumerate()
            .map(|(i, op)| engine_with(i as u32 + 2, *op))
            .collect();

        let mut token = Token::mint(NodeId::new(1), start);
        let mut expected = start;
        for (node, op) in nodes.iter_mut().zip(ops.iter()) {
            if let Some(op) = op {
                expected = op.apply(expected).balance();
            }
            match node.on_token(token, Instant::now()) {
                Action::Forward(out) => {
                    // origin never changes and balance never goes negative
                    prop_assert_eq!(out.origin, NodeId::new(1));
                    prop_assert!(!out.stop);
                    prop_assert_eq!(out.balance, expected);
                    token = out;
                }
                other => prop_assert!(false, "unexpected action {:?}", other),
            }
            node.forwarded();
            prop_assert_eq!(node.pending(), None);
        }

        // Stop flood: every node forwards once and runs nothing
        let stop = token.with_stop();
        for node in nodes.iter_mut() {
            prop_assert_eq!(node.on_token(stop, Instant::now()), Action::Terminate(stop));
            node.forwarded();
            prop_assert!(node.is_stopped());
            prop_assert_eq!(node.on_token(token, Instant::now()), Action::Ignore);
        }
    }
}
