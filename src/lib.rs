//! opspulse: scheduled ops cycles, risk scoring, and daily briefings over a
//! local SQLite store, fronted by a small HTTP API.

pub mod briefing;
pub mod config;
pub mod cycle;
pub mod db;
pub mod migrations;
pub mod remote;
pub mod risk;
pub mod server;
