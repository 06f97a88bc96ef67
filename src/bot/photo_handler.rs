//! Photo Handler module: download, classify and answer with breed buttons

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::classifier::top_alternatives;
use crate::context::AppContext;
use crate::errors::{ClassifierError, PhotoError};
use crate::monitoring::Level;

use super::ui_builder::{build_breed_reply, BreedReply};

/// Alternatives offered next to the top guess
pub const ALTERNATIVE_COUNT: usize = 3;

/// Last path segment of a Telegram file path (`photos/file_12.jpg` → `file_12.jpg`)
pub fn remote_basename(file_path: &str) -> Option<&str> {
    file_path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Download URL of a Telegram file on the configured Bot API server
pub fn file_url(api_url: &Url, token: &str, file_path: &str) -> Result<Url, PhotoError> {
    api_url
        .join(&format!("file/bot{token}/{file_path}"))
        .map_err(|e| PhotoError::DownloadFailed(format!("cannot build file URL: {e}")))
}

/// Download a Telegram file into `data_dir`, named after the remote basename.
///
/// Returns the file name and the local path.
pub async fn download_file(
    bot: &Bot,
    file_id: FileId,
    data_dir: &Path,
) -> Result<(String, PathBuf), PhotoError> {
    let file = bot
        .get_file(file_id)
        .await
        .map_err(|e| PhotoError::DownloadFailed(format!("getFile failed: {e}")))?;

    let file_name = remote_basename(&file.path)
        .ok_or_else(|| PhotoError::DownloadFailed(format!("bad file path: {}", file.path)))?
        .to_string();

    let url = file_url(&bot.api_url(), bot.token(), &file.path)?;

    let bytes = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| PhotoError::DownloadFailed(e.without_url().to_string()))?
        .bytes()
        .await
        .map_err(|e| PhotoError::DownloadFailed(e.without_url().to_string()))?;

    let target = data_dir.join(&file_name);
    let mut staged = NamedTempFile::new_in(data_dir)
        .map_err(|e| PhotoError::DownloadFailed(format!("cannot stage download: {e}")))?;
    staged
        .write_all(&bytes)
        .map_err(|e| PhotoError::DownloadFailed(format!("cannot write download: {e}")))?;
    staged
        .persist(&target)
        .map_err(|e| PhotoError::DownloadFailed(format!("cannot store download: {}", e.error)))?;

    debug!(file_name = %file_name, bytes = bytes.len(), "Picture downloaded");
    Ok((file_name, target))
}

/// Classify a downloaded picture and build the reply
pub async fn analyze_photo(
    ctx: &AppContext,
    image_path: PathBuf,
    file_name: &str,
) -> Result<BreedReply, PhotoError> {
    let classifier = Arc::clone(&ctx.classifier);
    let prediction = tokio::task::spawn_blocking(move || classifier.predict(&image_path))
        .await
        .map_err(|e| ClassifierError::Inference(format!("classifier task failed: {e}")))??;

    let classes = ctx.classifier.classes();
    if prediction.scores.len() != classes.len() {
        return Err(ClassifierError::Inference(format!(
            "got {} scores for {} classes",
            prediction.scores.len(),
            classes.len()
        ))
        .into());
    }

    let top = classes
        .iter()
        .position(|class| *class == prediction.label)
        .ok_or_else(|| {
            PhotoError::FormattingFailed(format!("unknown label: {}", prediction.label))
        })?;

    info!(
        file_name = %file_name,
        label = %prediction.label,
        confidence = prediction.confidence,
        "Breed predicted"
    );

    let alternatives: Vec<&str> = top_alternatives(&prediction.scores, top, ALTERNATIVE_COUNT)
        .into_iter()
        .map(|i| classes[i].as_str())
        .collect();

    build_breed_reply(&ctx.i18n, file_name, &prediction.label, &alternatives)
}

async fn download_and_analyze(
    bot: &Bot,
    ctx: &AppContext,
    file_id: FileId,
) -> Result<BreedReply, PhotoError> {
    let (file_name, path) = download_file(bot, file_id, ctx.labels.data_dir()).await?;
    analyze_photo(ctx, path, &file_name).await
}

async fn process_photo(
    bot: &Bot,
    ctx: &AppContext,
    chat_id: ChatId,
    file_id: FileId,
) -> Result<(), PhotoError> {
    let reply = download_and_analyze(bot, ctx, file_id).await?;
    bot.send_message(chat_id, reply.text)
        .reply_markup(reply.keyboard)
        .await
        .map_err(|e| PhotoError::ReplyFailed(e.to_string()))?;
    Ok(())
}

/// Report how a photo went and return the apology to send, if any
pub fn finish_photo(ctx: &AppContext, result: Result<(), PhotoError>) -> Option<String> {
    match result {
        Ok(()) => {
            ctx.monitor.report_message("Processed a picture", Level::Info);
            None
        }
        Err(e) => {
            error!(error = %e, "Photo processing failed");
            ctx.monitor.report_error(&anyhow::Error::from(e), "photo");
            Some(ctx.i18n.t("photo-failed"))
        }
    }
}

/// Handle an incoming photo message
pub async fn photo_handler(bot: Bot, msg: Message, ctx: Arc<AppContext>) -> Result<()> {
    let chat_id = msg.chat.id;
    let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) else {
        return Ok(());
    };

    info!(user_id = %chat_id, file_id = %largest_photo.file.id, "Received a photo");

    if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
        warn!(user_id = %chat_id, error = %e, "Failed to send typing notification");
    }

    let result = process_photo(&bot, &ctx, chat_id, largest_photo.file.id.clone()).await;
    if let Some(apology) = finish_photo(&ctx, result) {
        bot.send_message(chat_id, apology).await?;
    }

    Ok(())
}
