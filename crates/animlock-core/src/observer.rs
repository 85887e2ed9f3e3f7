//! Glue between a decoded [`Bundle`] and the [`AnimLockTracker`]: walks each
//! message's IPC envelope, dispatches on dialect-resolved subtype, and
//! re-encodes any payload the tracker chose to rewrite.

use animlock_proto::ipc::{IPC_TYPE_INTERESTED, IpcEnvelope};
use animlock_proto::message::{Message, SEGMENT_TYPE_IPC};
use animlock_proto::payloads::{ActionEffect, CATEGORY_CANCEL_CAST, CATEGORY_ROLLBACK, ActorCast, ActorControl, ActorControlSelf};
use animlock_proto::Bundle;
use bytes::{Bytes, BytesMut};
use zerocopy::IntoBytes;

use crate::clock::Clock;
use crate::dialect::Dialect;
use crate::tracker::{AnimLockTracker, EffectOutcome};

/// Which side of the connection produced the bundle being observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client → server.
    ClientToServer,
    /// Server → client.
    ServerToClient,
}

/// Walk every IPC envelope in `bundle`, apply the tracker's policy, and
/// rewrite `bundle.messages` in place with any mutated payloads re-encoded.
/// Messages outside the IPC segment type, or IPC envelopes outside the
/// dialect's four tracked subtypes, pass through byte-identical.
pub fn observe_bundle<C: Clock>(
    bundle: &mut Bundle,
    direction: Direction,
    dialect: Dialect,
    tracker: &mut AnimLockTracker<C>,
) {
    let mut offset = 0usize;
    let mut rebuilt = BytesMut::with_capacity(bundle.messages.len());
    let total = bundle.messages.len();

    while offset < total {
        match Message::decode(&bundle.messages[offset..], total - offset) {
            Ok((mut message, consumed)) => {
                if message.segment_type == SEGMENT_TYPE_IPC {
                    rewrite_ipc_segment(&mut message.data, direction, dialect, tracker,
                        message.source_actor, message.target_actor);
                }
                message.encode(&mut rebuilt);
                offset += consumed;
            },
            Err(_) => {
                // Can't safely continue parsing; pass the remainder through
                // byte-identical rather than risk misinterpreting it.
                rebuilt.extend_from_slice(&bundle.messages[offset..]);
                break;
            },
        }
    }

    bundle.messages = rebuilt.freeze();
}

fn rewrite_ipc_segment<C: Clock>(
    data: &mut Bytes,
    direction: Direction,
    dialect: Dialect,
    tracker: &mut AnimLockTracker<C>,
    source_actor: u32,
    target_actor: u32,
) {
    let Ok(ipc) = IpcEnvelope::decode(data) else { return };
    if ipc.ipc_type != IPC_TYPE_INTERESTED {
        return;
    }

    let rewritten = match direction {
        Direction::ClientToServer => {
            observe_client_to_server(&ipc, dialect, tracker);
            None
        },
        Direction::ServerToClient => {
            if source_actor != target_actor {
                None
            } else {
                observe_server_to_client(&ipc, dialect, tracker)
            }
        },
    };

    if let Some(new_data) = rewritten {
        let mut envelope = ipc;
        envelope.data = new_data;
        let mut buf = BytesMut::new();
        envelope.encode(&mut buf);
        *data = buf.freeze();
    }
}

fn observe_client_to_server<C: Clock>(
    ipc: &IpcEnvelope,
    dialect: Dialect,
    tracker: &mut AnimLockTracker<C>,
) {
    if ipc.subtype != dialect.request_action {
        return;
    }
    tracker.observe_request();
}

/// Returns `Some(new IPC payload bytes)` when the effect was rewritten;
/// `None` means pass the frame through byte-identical (including when a
/// decode failure on the payload is silently swallowed).
fn observe_server_to_client<C: Clock>(
    ipc: &IpcEnvelope,
    dialect: Dialect,
    tracker: &mut AnimLockTracker<C>,
) -> Option<Bytes> {
    if dialect.is_action_result(ipc.subtype) {
        let effect = ActionEffect::from_bytes(&ipc.data).ok()?;
        let action_id = effect.action_id();
        let duration_in = effect.animation_lock_duration();

        return match tracker.observe_action_effect(action_id, duration_in) {
            EffectOutcome::Rewritten(new_duration) => {
                let mut effect = *effect;
                effect.set_animation_lock_duration(new_duration);
                let mut buf = BytesMut::from(&ipc.data[..]);
                buf[..ActionEffect::SIZE].copy_from_slice(effect.as_bytes());
                Some(buf.freeze())
            },
            EffectOutcome::PassThrough | EffectOutcome::CastPassThrough => None,
        };
    }

    if ipc.subtype == dialect.response_actor_control_self {
        if let Ok(control) = ActorControlSelf::from_bytes(&ipc.data) {
            if control.category() == CATEGORY_ROLLBACK {
                tracker.observe_rollback();
            }
        }
        return None;
    }

    if ipc.subtype == dialect.response_actor_control {
        if let Ok(control) = ActorControl::from_bytes(&ipc.data) {
            if control.category() == CATEGORY_CANCEL_CAST {
                tracker.observe_cancel_cast();
            }
        }
        return None;
    }

    if ipc.subtype == dialect.response_actor_cast && ActorCast::from_bytes(&ipc.data).is_ok() {
        tracker.observe_cast();
    }

    None
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use animlock_proto::message::MessageHeader;
    use animlock_proto::{BUNDLE_MAGIC_A, IPC_TYPE_INTERESTED};

    use super::*;
    use crate::dialect::INTL;

    #[derive(Clone)]
    struct FixedClock {
        now: Instant,
    }

    impl Clock for FixedClock {
        fn now(&self) -> Instant {
            self.now
        }

        fn random_unit(&self) -> f64 {
            0.9
        }
    }

    fn ipc_bytes(subtype: u16, payload: &[u8]) -> Bytes {
        let envelope = IpcEnvelope {
            ipc_type: IPC_TYPE_INTERESTED,
            subtype,
            server_id: 0,
            epoch: 0,
            unknown1: [0u8; 2],
            unknown2: [0u8; 4],
            data: Bytes::copy_from_slice(payload),
        };
        let mut buf = BytesMut::new();
        envelope.encode(&mut buf);
        buf.freeze()
    }

    fn message_bytes(source: u32, target: u32, data: Bytes) -> Vec<u8> {
        let message = Message {
            source_actor: source,
            target_actor: target,
            segment_type: SEGMENT_TYPE_IPC,
            unknown1: [0u8; 2],
            data,
        };
        let mut out = Vec::new();
        message.encode(&mut out);
        out
    }

    fn action_effect_payload(action_id: u32, duration: f32) -> Vec<u8> {
        let mut bytes = vec![0u8; ActionEffect::SIZE];
        bytes[4..8].copy_from_slice(&action_id.to_le_bytes());
        bytes[16..20].copy_from_slice(&duration.to_le_bytes());
        bytes
    }

    fn bundle_with_messages(messages: Vec<u8>) -> Bundle {
        Bundle {
            timestamp: 0,
            conn_type: 0,
            encoding: 0,
            zlib_compressed: false,
            magic: BUNDLE_MAGIC_A,
            message_count: 1,
            unknown1: [0u8; 2],
            unknown2: [0u8; 6],
            messages: Bytes::from(messages),
        }
    }

    #[test]
    fn end_to_end_normal_shorten() {
        let clock = FixedClock { now: Instant::now() };
        let mut tracker = AnimLockTracker::new(clock);

        let mut request_bundle =
            bundle_with_messages(message_bytes(1, 1, ipc_bytes(INTL.request_action, &[0u8; 8])));
        observe_bundle(&mut request_bundle, Direction::ClientToServer, INTL, &mut tracker);

        let effect_payload = action_effect_payload(0x1234, 0.600);
        let mut response_bundle = bundle_with_messages(message_bytes(
            1,
            1,
            ipc_bytes(INTL.response_action_result[0], &effect_payload),
        ));
        observe_bundle(&mut response_bundle, Direction::ServerToClient, INTL, &mut tracker);

        let (message, _) =
            Message::decode(&response_bundle.messages, response_bundle.messages.len()).unwrap();
        let ipc = IpcEnvelope::decode(&message.data).unwrap();
        let effect = ActionEffect::from_bytes(&ipc.data).unwrap();
        // Same fixed `now` for request and response (no simulated RTT), so
        // the full delay (extra margin + server duration) is still pending.
        assert!((effect.animation_lock_duration() - 0.675).abs() < 1e-3);
    }

    #[test]
    fn non_matching_actor_pair_is_untouched() {
        let clock = FixedClock { now: Instant::now() };
        let mut tracker = AnimLockTracker::new(clock);
        tracker.observe_request();

        let effect_payload = action_effect_payload(0x1234, 0.600);
        let original = message_bytes(1, 2, ipc_bytes(INTL.response_action_result[0], &effect_payload));
        let mut bundle = bundle_with_messages(original.clone());
        observe_bundle(&mut bundle, Direction::ServerToClient, INTL, &mut tracker);

        assert_eq!(bundle.messages.as_ref(), original.as_slice());
        assert_eq!(tracker.pending_len(), 1);
    }

    #[test]
    fn non_interesting_segment_type_passes_through() {
        let clock = FixedClock { now: Instant::now() };
        let mut tracker = AnimLockTracker::new(clock);

        let message = Message {
            source_actor: 1,
            target_actor: 1,
            segment_type: 99,
            unknown1: [0u8; 2],
            data: Bytes::from_static(b"opaque"),
        };
        let mut out = Vec::new();
        message.encode(&mut out);
        let original = out.clone();

        let mut bundle = bundle_with_messages(out);
        observe_bundle(&mut bundle, Direction::ServerToClient, INTL, &mut tracker);
        assert_eq!(bundle.messages.as_ref(), original.as_slice());
    }

    #[test]
    fn malformed_payload_is_swallowed_and_frame_passes_through() {
        let clock = FixedClock { now: Instant::now() };
        let mut tracker = AnimLockTracker::new(clock);
        tracker.observe_request();

        // Too short to be a valid ActionEffect.
        let original = message_bytes(1, 1, ipc_bytes(INTL.response_action_result[0], &[1, 2, 3]));
        let mut bundle = bundle_with_messages(original.clone());
        observe_bundle(&mut bundle, Direction::ServerToClient, INTL, &mut tracker);

        assert_eq!(bundle.messages.as_ref(), original.as_slice());
        assert_eq!(tracker.pending_len(), 1);
    }

    #[test]
    fn message_header_import_is_exercised_by_round_trip() {
        // MessageHeader itself is exercised via Message::decode in the
        // scenarios above; this just keeps the import honest against drift.
        let _ = MessageHeader::SIZE;
    }
}
