//! `ytq channel add|remove|list` – tracked channels for the fetch scheduler.

use anyhow::Result;
use ytq_core::store::ChannelStore;

use crate::cli::app::App;
use crate::cli::output::{print_channels, Output};
use crate::cli::ChannelAction;

pub async fn run_channel(app: &App, out: &Output, action: ChannelAction) -> Result<()> {
    match action {
        ChannelAction::Add {
            channel_id,
            title,
            config,
        } => {
            if let Some(name) = config.as_deref() {
                app.config
                    .downloader(name)
                    .map_err(|e| out.fail("CONFIG_NOT_FOUND", e.into()))?;
            }
            let channel = app
                .store
                .add_channel(&channel_id, title.as_deref(), config.as_deref())
                .await
                .map_err(|e| out.fail("STORE_ERROR", e))?;
            out.value(channel, |c| println!("Tracking channel {} (#{})", c.channel_id, c.id))
        }
        ChannelAction::Remove { channel_id } => {
            let removed = app
                .store
                .remove_channel(&channel_id)
                .await
                .map_err(|e| out.fail("STORE_ERROR", e))?;
            if !removed {
                return Err(out.fail(
                    "CHANNEL_NOT_FOUND",
                    anyhow::anyhow!("channel {channel_id} is not tracked"),
                ));
            }
            out.value(channel_id, |id| println!("Stopped tracking channel {id}"))
        }
        ChannelAction::List => {
            let channels = app
                .store
                .list_channels()
                .await
                .map_err(|e| out.fail("STORE_ERROR", e))?;
            out.value(channels, |c| print_channels(c))
        }
    }
}
