use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::commands::{Command, CommandHandler, Inbound};

/// Reduce a Telegram update to the fields the core acts on. Updates with
/// no sender or no text are ignored.
fn inbound_from(msg: &Message) -> Option<Inbound> {
    let sender = msg.from.as_ref()?;
    let text = msg.text()?;
    Some(Inbound {
        chat_id: msg.chat.id.0.to_string(),
        sender_id: sender.id.0.to_string(),
        sender_name: sender.first_name.clone(),
        text: text.to_string(),
    })
}

/// Run the long-polling dispatcher until shutdown.
pub async fn run(bot: Bot, handler: Arc<CommandHandler>) -> Result<()> {
    info!("Starting Telegram dispatcher...");

    let tree = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_text));

    Dispatcher::builder(bot, tree)
        .dependencies(dptree::deps![handler])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("pagebot"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    msg: Message,
    command: Command,
    handler: Arc<CommandHandler>,
) -> ResponseResult<()> {
    if let Some(inbound) = inbound_from(&msg) {
        info!(
            "Command {:?} from user {} in chat {}",
            command, inbound.sender_id, inbound.chat_id
        );
        handler.dispatch(Some(command), &inbound).await;
    }
    Ok(())
}

async fn handle_text(msg: Message, handler: Arc<CommandHandler>) -> ResponseResult<()> {
    if let Some(inbound) = inbound_from(&msg) {
        info!("Message from chat {}: {}", inbound.chat_id, inbound.text);
        handler.dispatch(None, &inbound).await;
    }
    Ok(())
}
