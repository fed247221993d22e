// SPDX-License-Identifier: MIT

use super::*;
use dispatcher_core::JobId;
use yare::parameterized;

fn frames(parts: &[&[u8]]) -> Vec<Vec<u8>> {
    parts.iter().map(|p| p.to_vec()).collect()
}

#[test]
fn decodes_hello() {
    let msg = InboundMsg::decode(&frames(&[b"HELLO", b"1"])).unwrap();
    assert_eq!(msg, InboundMsg::Hello { version: 1 });
}

#[test]
fn decodes_hello_retry() {
    let msg = InboundMsg::decode(&frames(&[b"HELLO_RETRY", b"1"])).unwrap();
    assert_eq!(msg, InboundMsg::HelloRetry { version: 1 });
}

#[test]
fn decodes_ping() {
    let msg = InboundMsg::decode(&frames(&[b"PING"])).unwrap();
    assert_eq!(msg, InboundMsg::Ping);
}

#[test]
fn decodes_end() {
    let msg = InboundMsg::decode(&frames(&[b"END", b"42", b"1", b"boom", b"\x00"])).unwrap();
    assert_eq!(
        msg,
        InboundMsg::End {
            job_id: JobId::new(42),
            exit_code: 1,
            error_msg: "boom".to_string(),
            description_lzma: vec![0],
        }
    );
}

#[test]
fn decodes_start_ok() {
    let msg = InboundMsg::decode(&frames(&[b"START_OK", b"7"])).unwrap();
    assert_eq!(msg, InboundMsg::StartOk { job_id: JobId::new(7) });
}

#[test]
fn unknown_verb_is_not_an_error() {
    let msg = InboundMsg::decode(&frames(&[b"BOGUS"])).unwrap();
    assert_eq!(msg, InboundMsg::Unknown { verb: "BOGUS".to_string() });
}

#[test]
fn empty_message_has_no_verb() {
    assert_eq!(InboundMsg::decode(&[]), Err(WireError::MissingVerb));
}

#[parameterized(
    missing_version = { &[b"HELLO"] },
    extra_args = { &[b"HELLO", b"1", b"2"] },
)]
fn hello_arity_errors(parts: &[&[u8]]) {
    assert!(InboundMsg::decode(&frames(parts)).is_err());
}

#[test]
fn non_integer_job_id_is_rejected() {
    let err = InboundMsg::decode(&frames(&[b"START_OK", b"not-a-number"])).unwrap_err();
    assert_eq!(err, WireError::NotAnInteger { field: "job_id" });
}

#[test]
fn outbound_start_round_trips_frame_count() {
    let msg = OutboundMsg::Start {
        job_id: JobId::new(1),
        definition: "def".into(),
        device_config: "dev".into(),
        dispatcher_config: "disp".into(),
        env: "env".into(),
        env_dut: "dut".into(),
    };
    assert_eq!(msg.encode().len(), 7);
}

#[test]
fn outbound_end_ok_carries_job_id() {
    let msg = OutboundMsg::EndOk { job_id: JobId::new(99999) };
    let encoded = msg.encode();
    assert_eq!(encoded, vec![b"END_OK".to_vec(), b"99999".to_vec()]);
}
