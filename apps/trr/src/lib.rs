//! # trr
//!
//! Server and CLI front-ends for the TRR workflow engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      apps/trr (THE BINARY)                   │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐  │
//! │  │   CLI       │    │   HTTP API  │    │  Assist Client   │  │
//! │  │  (clap)     │    │   (axum)    │    │  (reqwest)       │  │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘  │
//! │         │                  │                    │            │
//! │         └──────────────────┼────────────────────┘            │
//! │                            ▼                                 │
//! │                    ┌───────────────┐                         │
//! │                    │   trr-core    │                         │
//! │                    │ (THE LOGIC)   │                         │
//! │                    └───────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod assist;
pub mod cli;
pub mod config;
