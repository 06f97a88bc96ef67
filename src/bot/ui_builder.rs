//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::classifier::class_to_human;
use crate::errors::PhotoError;
use crate::localization::LocalizationManager;

use super::callback_handler::FeedbackAction;

/// Telegram rejects callback data longer than this many bytes
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

/// Text and buttons answering a classified photo
#[derive(Debug, Clone)]
pub struct BreedReply {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

/// Build the breed guess reply.
///
/// One button per row: the confirmation first, then one per alternative
/// label carrying `<file_name>,<label>` as its payload.
pub fn build_breed_reply(
    i18n: &LocalizationManager,
    file_name: &str,
    top_label: &str,
    alternatives: &[&str],
) -> Result<BreedReply, PhotoError> {
    let text = i18n.t_args("breed-guess", &[("breed", &class_to_human(top_label))]);

    let mut buttons = vec![vec![InlineKeyboardButton::callback(
        i18n.t("button-correct"),
        FeedbackAction::Confirm.to_payload(),
    )]];

    for label in alternatives {
        let payload = FeedbackAction::Correction {
            filename: file_name.to_string(),
            class_id: label.to_string(),
        }
        .to_payload();

        if payload.len() > MAX_CALLBACK_DATA_LEN {
            return Err(PhotoError::FormattingFailed(format!(
                "callback payload too long ({} bytes): {payload}",
                payload.len()
            )));
        }

        buttons.push(vec![InlineKeyboardButton::callback(
            class_to_human(label),
            payload,
        )]);
    }

    Ok(BreedReply {
        text,
        keyboard: InlineKeyboardMarkup::new(buttons),
    })
}
