//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::errors::FeedbackParseError;
use crate::monitoring::Level;

/// Payload of the "Yep!" button
pub const CONFIRM_PAYLOAD: &str = "correct";

/// What a pressed button means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackAction {
    /// The top guess was right
    Confirm,
    /// The user picked another breed for the picture
    Correction { filename: String, class_id: String },
}

impl FeedbackAction {
    /// Parse inline button data.
    ///
    /// The class id is not checked against the class list: the buttons are
    /// generated by the bot itself.
    pub fn parse(data: &str) -> Result<Self, FeedbackParseError> {
        if data.is_empty() {
            return Err(FeedbackParseError::Empty);
        }
        if data == CONFIRM_PAYLOAD {
            return Ok(Self::Confirm);
        }
        if data.contains(['\n', '\r']) {
            return Err(FeedbackParseError::ForbiddenCharacter(data.to_string()));
        }

        let (filename, class_id) = data
            .split_once(',')
            .ok_or_else(|| FeedbackParseError::MissingSeparator(data.to_string()))?;

        if filename.is_empty() || class_id.is_empty() {
            return Err(FeedbackParseError::EmptyField(data.to_string()));
        }
        if filename.contains(['/', '\\']) || filename == "." || filename == ".." {
            return Err(FeedbackParseError::ForbiddenCharacter(data.to_string()));
        }

        Ok(Self::Correction {
            filename: filename.to_string(),
            class_id: class_id.to_string(),
        })
    }

    /// Inline button data for this action
    pub fn to_payload(&self) -> String {
        match self {
            Self::Confirm => CONFIRM_PAYLOAD.to_string(),
            Self::Correction { filename, class_id } => format!("{filename},{class_id}"),
        }
    }
}

/// Persist and report the feedback, returning the text that replaces the
/// original message.
pub fn apply_feedback(ctx: &AppContext, action: &FeedbackAction) -> Result<String> {
    match action {
        FeedbackAction::Confirm => Ok(ctx.i18n.t("feedback-correct")),
        FeedbackAction::Correction { filename, class_id } => {
            ctx.labels.append(&action.to_payload())?;
            info!(file_name = %filename, label = %class_id, "Recorded corrected label");
            ctx.monitor.report_message("Made an incorrect prediction", Level::Info);
            Ok(ctx.i18n.t("feedback-thanks"))
        }
    }
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: teloxide::types::CallbackQuery,
    ctx: Arc<AppContext>,
) -> Result<()> {
    let data = q.data.as_deref().unwrap_or("");
    debug!(user_id = %q.from.id, data = %data, "Received callback query from user");

    match FeedbackAction::parse(data) {
        Ok(action) => match apply_feedback(&ctx, &action) {
            Ok(reply_text) => {
                if let Some(msg) = &q.message {
                    if let Err(e) = bot
                        .edit_message_text(msg.chat().id, msg.id(), reply_text)
                        .await
                    {
                        error!(
                            user_id = %q.from.id,
                            error = %e,
                            "Failed to edit message after feedback"
                        );
                    }
                }
            }
            Err(e) => {
                error!(user_id = %q.from.id, error = %e, "Failed to record feedback");
                ctx.monitor.report_error(&e, "feedback");
            }
        },
        Err(e) => {
            warn!(user_id = %q.from.id, error = %e, "Rejected callback payload");
            ctx.monitor.report_message(&format!("Rejected callback payload: {e}"), Level::Warning);
        }
    }

    // Answer the callback query to remove the loading state
    bot.answer_callback_query(q.id).await?;

    Ok(())
}
