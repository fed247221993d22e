// SPDX-License-Identifier: MIT

//! Control-socket message shapes (spec §6.3, §9 "Dynamic message shapes").

use crate::error::WireError;
use dispatcher_core::JobId;

/// A message received from a worker, already split off its identity frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMsg {
    Hello { version: u32 },
    HelloRetry { version: u32 },
    Ping,
    End { job_id: JobId, exit_code: i32, error_msg: String, description_lzma: Vec<u8> },
    StartOk { job_id: JobId },
    /// Any verb this protocol version doesn't recognise.
    Unknown { verb: String },
}

fn frame_str(frames: &[Vec<u8>], idx: usize, field: &'static str) -> Result<String, WireError> {
    let frame = frames.get(idx).ok_or(WireError::WrongArity {
        verb: String::new(),
        expected: idx + 1,
        got: frames.len(),
    })?;
    String::from_utf8(frame.clone()).map_err(|_| WireError::NotUtf8 { field })
}

fn frame_int<T: std::str::FromStr>(frames: &[Vec<u8>], idx: usize, field: &'static str) -> Result<T, WireError> {
    frame_str(frames, idx, field)?.trim().parse::<T>().map_err(|_| WireError::NotAnInteger { field })
}

impl InboundMsg {
    /// `frames` is `[verb, arg0, arg1, ...]` — the hostname identity frame
    /// must already have been stripped off by the transport layer.
    pub fn decode(frames: &[Vec<u8>]) -> Result<Self, WireError> {
        let verb_bytes = frames.first().ok_or(WireError::MissingVerb)?;
        let verb = String::from_utf8_lossy(verb_bytes).into_owned();
        let args = &frames[1..];

        match verb.as_str() {
            "HELLO" | "HELLO_RETRY" => {
                if args.len() != 1 {
                    return Err(WireError::WrongArity { verb, expected: 1, got: args.len() });
                }
                let version: u32 = frame_int(args, 0, "version")?;
                Ok(if verb == "HELLO" {
                    InboundMsg::Hello { version }
                } else {
                    InboundMsg::HelloRetry { version }
                })
            }
            "PING" => {
                if !args.is_empty() {
                    return Err(WireError::WrongArity { verb, expected: 0, got: args.len() });
                }
                Ok(InboundMsg::Ping)
            }
            "END" => {
                if args.len() != 4 {
                    return Err(WireError::WrongArity { verb, expected: 4, got: args.len() });
                }
                let job_id: u64 = frame_int(args, 0, "job_id")?;
                let exit_code: i32 = frame_int(args, 1, "exit_code")?;
                let error_msg = frame_str(args, 2, "error_msg")?;
                let description_lzma = args[3].clone();
                Ok(InboundMsg::End {
                    job_id: JobId::new(job_id),
                    exit_code,
                    error_msg,
                    description_lzma,
                })
            }
            "START_OK" => {
                if args.len() != 1 {
                    return Err(WireError::WrongArity { verb, expected: 1, got: args.len() });
                }
                let job_id: u64 = frame_int(args, 0, "job_id")?;
                Ok(InboundMsg::StartOk { job_id: JobId::new(job_id) })
            }
            _ => Ok(InboundMsg::Unknown { verb }),
        }
    }
}

/// A message sent to a worker (identity frame prepended by the transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMsg {
    HelloOk,
    Pong,
    EndOk { job_id: JobId },
    Status { job_id: JobId },
    Start {
        job_id: JobId,
        definition: String,
        device_config: String,
        dispatcher_config: String,
        env: String,
        env_dut: String,
    },
    Cancel { job_id: JobId },
}

impl OutboundMsg {
    pub fn encode(&self) -> Vec<Vec<u8>> {
        match self {
            OutboundMsg::HelloOk => vec![b"HELLO_OK".to_vec()],
            OutboundMsg::Pong => vec![b"PONG".to_vec()],
            OutboundMsg::EndOk { job_id } => {
                vec![b"END_OK".to_vec(), job_id.to_string().into_bytes()]
            }
            OutboundMsg::Status { job_id } => {
                vec![b"STATUS".to_vec(), job_id.to_string().into_bytes()]
            }
            OutboundMsg::Start { job_id, definition, device_config, dispatcher_config, env, env_dut } => {
                vec![
                    b"START".to_vec(),
                    job_id.to_string().into_bytes(),
                    definition.clone().into_bytes(),
                    device_config.clone().into_bytes(),
                    dispatcher_config.clone().into_bytes(),
                    env.clone().into_bytes(),
                    env_dut.clone().into_bytes(),
                ]
            }
            OutboundMsg::Cancel { job_id } => {
                vec![b"CANCEL".to_vec(), job_id.to_string().into_bytes()]
            }
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
