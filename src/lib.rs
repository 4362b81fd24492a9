//! Chat Relay - real-time chat broadcast
//!
//! Clients post short text messages over HTTP; every open listen stream
//! receives each message as newline-delimited JSON. Several instances can
//! share one chat through Redis PubSub.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
