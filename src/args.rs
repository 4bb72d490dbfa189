use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-harvest")]
#[command(about = "Scrape pages for PDF links and content, download and analyse them")]
#[command(version)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// WebDriver server URL (overrides the configuration and WEBDRIVER_URL)
    #[arg(long, global = true)]
    pub webdriver_url: Option<String>,

    /// Path of the automation driver binary
    #[arg(long, global = true)]
    pub driver_path: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long, global = true)]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find the PDF download links on a page
    Links {
        url: String,

        /// Download every link found
        #[arg(short, long)]
        download: bool,

        /// Folder to download into (defaults to the configured folder)
        #[arg(short, long)]
        folder: Option<PathBuf>,
    },

    /// Extract the structured content of a page
    Content {
        url: String,

        /// Print the page as JSON
        #[arg(long, conflicts_with = "text")]
        json: bool,

        /// Print the readable body text instead of the structured summary
        #[arg(long)]
        text: bool,
    },

    /// Download files into a folder
    Download {
        #[arg(required = true)]
        urls: Vec<String>,

        #[arg(short, long)]
        folder: Option<PathBuf>,
    },

    /// Extract the text of PDF files
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Scrape a page and have the language model analyse it
    Analyze {
        url: String,

        /// What to ask about the page
        #[arg(short, long)]
        prompt: String,
    },

    /// Check the browser install and the driver binary
    VerifyDriver,

    /// Download the driver build matching the installed browser
    InstallDriver {
        /// Browser version to fetch the driver for (detected if omitted)
        #[arg(long)]
        version: Option<String>,
    },
}
