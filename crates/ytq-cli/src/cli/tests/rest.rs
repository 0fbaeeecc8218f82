//! Tests for cancel, channel, fetch, daemon, reset.

use super::parse;
use crate::cli::{ChannelAction, Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_cancel() {
    match parse(&["ytq", "cancel", "67e55044-10b1-426f-9247-bb680e5fe0c8"]) {
        CliCommand::Cancel { id } => {
            assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8")
        }
        _ => panic!("expected Cancel"),
    }
}

#[test]
fn cli_parse_channel_add() {
    match parse(&[
        "ytq",
        "channel",
        "add",
        "UC_x5XG1OV2P6uZZ5FSM9Ttw",
        "--title",
        "Google for Developers",
        "-c",
        "audio",
    ]) {
        CliCommand::Channel {
            action:
                ChannelAction::Add {
                    channel_id,
                    title,
                    config,
                },
        } => {
            assert_eq!(channel_id, "UC_x5XG1OV2P6uZZ5FSM9Ttw");
            assert_eq!(title.as_deref(), Some("Google for Developers"));
            assert_eq!(config.as_deref(), Some("audio"));
        }
        _ => panic!("expected Channel Add"),
    }
}

#[test]
fn cli_parse_channel_remove_and_list() {
    match parse(&["ytq", "channel", "remove", "UC_x5XG1OV2P6uZZ5FSM9Ttw"]) {
        CliCommand::Channel {
            action: ChannelAction::Remove { channel_id },
        } => assert_eq!(channel_id, "UC_x5XG1OV2P6uZZ5FSM9Ttw"),
        _ => panic!("expected Channel Remove"),
    }
    match parse(&["ytq", "channel", "list"]) {
        CliCommand::Channel {
            action: ChannelAction::List,
        } => {}
        _ => panic!("expected Channel List"),
    }
    assert!(Cli::try_parse_from(["ytq", "channel"]).is_err());
}

#[test]
fn cli_parse_fetch_and_daemon() {
    match parse(&["ytq", "fetch"]) {
        CliCommand::Fetch { scheduler } => assert!(scheduler.is_none()),
        _ => panic!("expected Fetch"),
    }
    match parse(&["ytq", "daemon", "--scheduler", "nightly"]) {
        CliCommand::Daemon { scheduler } => assert_eq!(scheduler.as_deref(), Some("nightly")),
        _ => panic!("expected Daemon"),
    }
}

#[test]
fn cli_parse_reset() {
    match parse(&["ytq", "reset"]) {
        CliCommand::Reset { yes } => assert!(!yes),
        _ => panic!("expected Reset"),
    }
    match parse(&["ytq", "reset", "--yes"]) {
        CliCommand::Reset { yes } => assert!(yes),
        _ => panic!("expected Reset --yes"),
    }
}
