//! Command and plain text handlers

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info};

use crate::context::AppContext;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "say hello.")]
    Start,
    #[command(description = "show how many pictures were processed.")]
    Stats,
}

/// Greeting for `/start`
pub fn start_reply(ctx: &AppContext, first_name: &str) -> String {
    ctx.i18n.t_args("start-greeting", &[("name", first_name)])
}

/// Answer to `/stats`, `None` for anyone but the stats user
pub fn stats_reply(ctx: &AppContext, username: Option<&str>) -> Result<Option<String>> {
    if username != Some(ctx.config.stats_username.as_str()) {
        return Ok(None);
    }

    let count = ctx.labels.processed_count()?;
    Ok(Some(ctx.i18n.t_args("stats-processed", &[("count", &count.to_string())])))
}

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<AppContext>,
) -> Result<()> {
    let user = msg.from.as_ref();
    debug!(user_id = %msg.chat.id, command = ?cmd, "Received command");

    match cmd {
        Command::Start => {
            let first_name = user.map(|u| u.first_name.as_str()).unwrap_or("there");
            bot.send_message(msg.chat.id, start_reply(&ctx, first_name)).await?;
        }
        Command::Stats => {
            let username = user.and_then(|u| u.username.as_deref());
            match stats_reply(&ctx, username)? {
                Some(reply) => {
                    bot.send_message(msg.chat.id, reply).await?;
                }
                None => {
                    info!(user_id = %msg.chat.id, "Ignoring /stats from unauthorized user");
                }
            }
        }
    }

    Ok(())
}

/// Anything typed that isn't a command gets redirected to photos
pub async fn text_handler(bot: Bot, msg: Message, ctx: Arc<AppContext>) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received text message from user");
    bot.send_message(msg.chat.id, ctx.i18n.t("text-redirect")).await?;
    Ok(())
}
