//! # Dog Breed Telegram Bot
//!
//! A Telegram bot that guesses the breed of a dog photo with a pretrained
//! image classifier, offers alternative breeds as inline buttons and records
//! user corrections for later retraining.

pub mod bot;
pub mod classifier;
pub mod config;
pub mod context;
pub mod errors;
pub mod labels;
pub mod localization;
pub mod monitoring;
