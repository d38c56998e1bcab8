//! Subscription Service - Subscription lifecycle with a transactional outbox
//!
//! This crate implements the subscription state machine (trials, activation,
//! delinquency, cancellation, expiry) and delivers every committed change to
//! a message bus through an outbox relay.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
