//! Sol: turns a natural-language request into a short plan over a fixed
//! command grammar, asks before acting, runs the confirmed steps and keeps a
//! local ledger of every turn.

pub mod commands;
pub mod config;
pub mod confirm;
pub mod error;
pub mod executor;
pub mod grammar;
pub mod host;
pub mod ledger;
pub mod llm;
pub mod logging;
pub mod mode;
pub mod planner;
pub mod safety;
pub mod types;
pub mod ui;
pub mod validator;
