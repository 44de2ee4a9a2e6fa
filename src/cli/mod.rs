// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// PCB Vision Node CLI
#[derive(Parser, Debug)]
#[command(name = "pcb-cli")]
#[command(version = "0.1.0")]
#[command(about = "Client for a running PCB Vision Node", long_about = None)]
pub struct Cli {
    /// Base URL of the node
    #[arg(long, env = "NODE_URL", default_value = "http://127.0.0.1:5000", global = true)]
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the node is up and the model is loaded
    Health,

    /// Upload an image and save the annotated result
    Detect(client::DetectArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Health => client::check_health(&cli.url).await,
        Commands::Detect(args) => client::detect(&cli.url, args).await,
    }
}
