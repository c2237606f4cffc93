//! BlendLab Core — price windows, signal sources, combiner, session filter,
//! cost-adjusted evaluator.
//!
//! This crate contains the heart of the combination backtest:
//! - Domain types (bars, positions, time-indexed series)
//! - Price feeds and the date-bounded windows cut from them
//! - Indicators and the two signal sources built on them
//! - Voting combiner and tz-aware session filter
//! - Vectorised evaluator with a one-bar lag and proportional costs

pub mod components;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
