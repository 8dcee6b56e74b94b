// Copyright 2026 Inscriptor Contributors
// SPDX-License-Identifier: Apache-2.0

//! Inscriptor — batch newsletter-signup automation engine.
//!
//! Declarative per-site interaction scripts executed through a resilient
//! step interpreter against headless Chromium sessions, orchestrated as
//! background tasks with a poll-based status contract.

pub mod adapter;
pub mod browser;
pub mod config;
pub mod email;
pub mod error;
pub mod events;
pub mod interpreter;
pub mod proxy;
pub mod rest;
pub mod session;
pub mod task;
