// SPDX-License-Identifier: MIT

//! Property tests: arbitrary END frames decode back to the fields they
//! encoded, and arbitrary job ids survive the outbound START round trip.

use crate::control::{InboundMsg, OutboundMsg};
use crate::logframe::LogFrame;
use dispatcher_core::JobId;
use proptest::prelude::*;

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.-]{0,40}"
}

proptest! {
    #[test]
    fn end_frame_round_trips_fields(
        job_id in 1u64..1_000_000,
        exit_code in -10i32..10,
        error_msg in arb_text(),
        blob in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let frames = vec![
            job_id.to_string().into_bytes(),
            exit_code.to_string().into_bytes(),
            error_msg.clone().into_bytes(),
            blob.clone(),
        ];
        let mut full = vec![b"END".to_vec()];
        full.extend(frames);
        let decoded = InboundMsg::decode(&full).unwrap();
        prop_assert_eq!(
            decoded,
            InboundMsg::End {
                job_id: JobId::new(job_id),
                exit_code,
                error_msg,
                description_lzma: blob,
            }
        );
    }

    #[test]
    fn start_encode_always_has_seven_frames(job_id in 1u64..1_000_000, body in arb_text()) {
        let msg = OutboundMsg::Start {
            job_id: JobId::new(job_id),
            definition: body.clone(),
            device_config: body.clone(),
            dispatcher_config: body.clone(),
            env: body.clone(),
            env_dut: body,
        };
        prop_assert_eq!(msg.encode().len(), 7);
    }

    #[test]
    fn log_frame_traversal_check_matches_naive_scan(level in arb_text(), name in arb_text()) {
        let frames = vec![b"1".to_vec(), level.clone().into_bytes(), name.clone().into_bytes(), b"{lvl: info, msg: a}".to_vec()];
        let frame = LogFrame::decode(&frames).unwrap();
        prop_assert_eq!(frame.has_path_traversal(), level.contains('/') || name.contains('/'));
    }
}
