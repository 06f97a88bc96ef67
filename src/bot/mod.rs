//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `command_handler`: `/start`, `/stats` and plain text
//! - `photo_handler`: downloads and classifies incoming photos
//! - `callback_handler`: handles the breed buttons and records corrections
//! - `ui_builder`: creates keyboards and formats replies

pub mod callback_handler;
pub mod command_handler;
pub mod photo_handler;
pub mod ui_builder;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

pub use callback_handler::{apply_feedback, callback_handler, FeedbackAction};
pub use command_handler::{command_handler, text_handler, Command};
pub use photo_handler::{analyze_photo, finish_photo, photo_handler};
pub use ui_builder::{build_breed_reply, BreedReply};

/// Route updates to the handlers
pub fn schema() -> UpdateHandler<anyhow::Error> {
    let message_handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(dptree::filter(|msg: Message| msg.photo().is_some()).endpoint(photo_handler))
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some_and(|text| !text.starts_with('/')))
                .endpoint(text_handler),
        );

    dptree::entry()
        .branch(message_handler)
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}
