//! STOMP 1.2 over WebSocket.
//!
//! This crate carries the wire codec ([`Frame`]) and an async client
//! ([`WsTransport`] / [`WsSession`]) whose inbound events are merged onto a
//! single channel. The [`BusTransport`]/[`BusSession`] trait pair is the
//! seam the ingestion engine is written against, so protocol logic can be
//! exercised with scripted in-memory sessions instead of a live broker.

mod client;
mod errors;
mod frame;

pub use client::{
    redact_url, BusSession, BusTransport, ConnectOptions, SessionEvent,
    WsSession, WsTransport,
};
pub use errors::{StompError, StompResult};
pub use frame::{Command, Frame};
