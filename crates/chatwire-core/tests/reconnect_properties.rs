//! Property-based tests for reconnect policy and subscription convergence.

use std::time::{Duration, Instant};

use chatwire_core::{
    BackoffPolicy, BackoffState, ChannelMux, ConnectionAction, ConnectionConfig, ConnectionEvent,
    ConnectionManager,
};
use proptest::prelude::*;

/// Operations a caller or the network can perform against the multiplexer.
#[derive(Debug, Clone)]
enum MuxOp {
    Add(u64),
    Remove(u64),
    Drop,
    Reconnect,
}

fn mux_op_strategy() -> impl Strategy<Value = MuxOp> {
    prop_oneof![
        3 => (1u64..20).prop_map(MuxOp::Add),
        2 => (1u64..20).prop_map(MuxOp::Remove),
        1 => Just(MuxOp::Drop),
        1 => Just(MuxOp::Reconnect),
    ]
}

proptest! {
    /// For any sequence of channel changes and connect/disconnect events,
    /// once settled (a final resync), the server-subscribed set equals the
    /// desired set.
    #[test]
    fn subscriptions_converge_after_resync(ops in prop::collection::vec(mux_op_strategy(), 0..40)) {
        let mut mux = ChannelMux::new();
        let mut connected = true;

        for op in ops {
            match op {
                MuxOp::Add(id) => {
                    mux.add(chatwire_proto::conversation_channel(id), connected);
                },
                MuxOp::Remove(id) => {
                    mux.remove(&chatwire_proto::conversation_channel(id), connected);
                },
                MuxOp::Drop => {
                    mux.mark_disconnected();
                    connected = false;
                },
                MuxOp::Reconnect => {
                    mux.resync();
                    connected = true;
                },
            }
        }

        // Settle: the next successful connect resyncs
        let frames = mux.resync();
        prop_assert!(mux.converged());
        prop_assert_eq!(frames.len(), mux.desired().len());
    }

    /// Reconnect delay is non-decreasing in the consecutive-failure count,
    /// up to the configured maximum.
    #[test]
    fn backoff_monotone_in_consecutive_failures(
        failures in 0u32..50,
        attempt in 1u32..8,
    ) {
        let policy = BackoffPolicy::default();
        let lower = BackoffState { attempt, consecutive_failures: failures };
        let higher = BackoffState { attempt, consecutive_failures: failures + 1 };

        prop_assert!(higher.delay(&policy) >= lower.delay(&policy));
        prop_assert!(higher.delay(&policy) <= policy.max_delay);
    }

    /// A connection outliving the stability threshold resets the penalty:
    /// the next failure starts back at the base-plus-one-penalty delay.
    #[test]
    fn stable_connection_resets_delay_to_base(prior_failures in 1u32..30) {
        let policy = BackoffPolicy::default();
        let mut state = BackoffState { attempt: 0, consecutive_failures: prior_failures };

        state.record_open();
        state.record_close(Some(policy.stability_threshold + Duration::from_secs(1)), &policy);

        let mut fresh = BackoffState::new();
        fresh.record_close(Some(policy.stability_threshold + Duration::from_secs(1)), &policy);

        prop_assert_eq!(state.delay(&policy), fresh.delay(&policy));
    }
}

/// Drive the full connection manager through repeated short-lived
/// connections and collect the scheduled reconnect delays.
fn flapping_delays(lifetimes: &[Duration]) -> Vec<Duration> {
    let mut mgr: ConnectionManager<Instant> = ConnectionManager::new(ConnectionConfig {
        backoff: BackoffPolicy { max_attempts: 100, ..BackoffPolicy::default() },
    });
    let mut now = Instant::now();
    let mut delays = Vec::new();

    mgr.open("wss://broker").unwrap();
    for lifetime in lifetimes {
        mgr.handle(ConnectionEvent::SocketOpened { now });
        now += *lifetime;

        for action in mgr.handle(ConnectionEvent::SocketClosed { now }) {
            if let ConnectionAction::ScheduleReconnect { delay } = action {
                delays.push(delay);
                now += delay;
            }
        }
        mgr.handle(ConnectionEvent::ReconnectElapsed);
    }
    delays
}

/// Scenario: three consecutive connections each lasting 2s, below the 10s
/// stability threshold. The fourth reconnect delay is strictly greater than
/// the second due to accumulated penalty.
#[test]
fn flapping_connection_pays_growing_penalty() {
    let short = Duration::from_secs(2);
    let delays = flapping_delays(&[short, short, short, short]);

    assert_eq!(delays.len(), 4);
    assert!(delays[3] > delays[1], "expected {:?} > {:?}", delays[3], delays[1]);
}

/// A connection that survives past the stability threshold resets the
/// penalty; the delay after its eventual drop returns to the first-failure
/// value.
#[test]
fn stable_connection_clears_the_penalty() {
    let short = Duration::from_secs(2);
    let long = Duration::from_secs(60);

    let delays = flapping_delays(&[short, short, short, long, short]);
    assert_eq!(delays.len(), 5);
    assert_eq!(delays[4], delays[0]);
}
