//! Command-line interface definitions
//!
//! Every screen of the companion has a subcommand. Global options select
//! the API server, the data directory and the log level.
//!
//! # Example
//!
//! ```bash
//! # Sign in once; the token is kept in the data directory
//! companion login maria@example.org
//!
//! # What is on right now?
//! companion now
//!
//! # Workshops on the second day that I registered for
//! companion workshops --date 2025-04-26 --filter registered
//! ```

use app_core::WorkshopFilter;
use app_ui::{ColorScheme, ThemePreference};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Conference companion for attendees.
///
/// Browse the agenda, register for workshops, show your QR badge and
/// check your profile from the terminal.
#[derive(Debug, Parser)]
#[command(name = "companion")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(long, value_name = "PATH", global = true, env = "COMPANION_CONFIG")]
    pub config: Option<PathBuf>,

    /// API base URL, overriding the configuration file
    #[arg(long, value_name = "URL", global = true, env = "COMPANION_API_URL")]
    pub api_url: Option<String>,

    /// Directory holding the session token and preferences
    #[arg(long, value_name = "DIR", global = true, env = "COMPANION_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login(LoginArgs),
    /// Sign out and forget the stored token
    Logout,
    /// Show the attendee profile
    Whoami,
    /// Show the conference schedule
    Agenda(AgendaArgs),
    /// Events happening right now
    Now,
    /// Events starting next today
    Next,
    /// List workshops
    Workshops(WorkshopsArgs),
    /// Show one workshop with its registration state
    Workshop(WorkshopArgs),
    /// Register for a workshop
    Enroll(WorkshopArgs),
    /// Cancel a workshop registration
    Unenroll(WorkshopArgs),
    /// Join or leave a workshop waiting list
    #[command(subcommand)]
    Waitlist(WaitlistCommand),
    /// Show the QR badge
    Badge(BadgeArgs),
    /// Show the uploaded CV
    Cv,
    /// Show or change the theme
    Theme(ThemeArgs),
    /// List sponsors or show one sponsor
    Sponsors(SponsorsArgs),
    /// Resolve a deep link to a screen
    Open(OpenArgs),
    /// Show the effective configuration or save it
    Config(ConfigArgs),
}

/// Arguments for the login subcommand
#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(value_name = "EMAIL")]
    pub email: String,

    /// Account password
    #[arg(long, env = "COMPANION_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments for the agenda subcommand
#[derive(Debug, Clone, Args)]
pub struct AgendaArgs {
    /// Day id to show (e.g. day2); all days when omitted
    #[arg(long, value_name = "DAY")]
    pub day: Option<String>,
}

/// Arguments for the workshops subcommand
#[derive(Debug, Clone, Args)]
pub struct WorkshopsArgs {
    /// Only workshops on this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Status filter: all, registered or waiting
    #[arg(long, value_name = "FILTER", default_value = "all", value_parser = parse_filter)]
    pub filter: WorkshopFilter,
}

/// A workshop id
#[derive(Debug, Clone, Args)]
pub struct WorkshopArgs {
    /// Workshop id
    #[arg(value_name = "ID")]
    pub id: String,
}

/// Waiting list subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum WaitlistCommand {
    /// Queue for a full workshop
    Join(WorkshopArgs),
    /// Leave the queue
    Leave(WorkshopArgs),
}

/// Arguments for the badge subcommand
#[derive(Debug, Clone, Args)]
pub struct BadgeArgs {
    /// Write the badge image to this file instead of printing a data URL
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

/// Arguments for the theme subcommand
#[derive(Debug, Clone, Args)]
pub struct ThemeArgs {
    /// New preference
    #[arg(value_enum)]
    pub preference: Option<ThemeArg>,

    /// Record the device color scheme used by the `system` preference
    #[arg(long, value_enum)]
    pub device: Option<DeviceSchemeArg>,
}

/// Theme preference argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    /// Always light
    Light,
    /// Always dark
    Dark,
    /// Follow the device
    System,
}

impl From<ThemeArg> for ThemePreference {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => ThemePreference::Light,
            ThemeArg::Dark => ThemePreference::Dark,
            ThemeArg::System => ThemePreference::System,
        }
    }
}

/// Device color scheme argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceSchemeArg {
    /// Light device
    Light,
    /// Dark device
    Dark,
}

impl From<DeviceSchemeArg> for ColorScheme {
    fn from(arg: DeviceSchemeArg) -> Self {
        match arg {
            DeviceSchemeArg::Light => ColorScheme::Light,
            DeviceSchemeArg::Dark => ColorScheme::Dark,
        }
    }
}

/// Arguments for the sponsors subcommand
#[derive(Debug, Clone, Args)]
pub struct SponsorsArgs {
    /// Sponsor slug; lists all sponsors when omitted
    #[arg(value_name = "SLUG")]
    pub slug: Option<String>,
}

/// Arguments for the open subcommand
#[derive(Debug, Clone, Args)]
pub struct OpenArgs {
    /// Path such as /workshop/12 or /sponsor/aegean-grid
    #[arg(value_name = "PATH")]
    pub path: String,
}

/// Arguments for the config subcommand
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Write the effective configuration (including --api-url and --data-dir) to the config file
    #[arg(long)]
    pub save: bool,
}

fn parse_filter(s: &str) -> Result<WorkshopFilter, String> {
    s.parse()
}
