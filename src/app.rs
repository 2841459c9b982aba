//! Application wiring
//!
//! [`Companion`] opens the data directory, builds the API agent and the
//! services on top of it, restores the stored session and runs one command.
//! Commands return their output as text; alerts become errors carrying the
//! alert text.

use crate::cli::{
    AgendaArgs, BadgeArgs, Commands, ConfigArgs, LoginArgs, OpenArgs, SponsorsArgs, ThemeArgs,
    WaitlistCommand, WorkshopsArgs,
};
use crate::config::AppConfig;
use anyhow::{bail, Context, Result};
use app_core::workshops::{description_text, time_display, CatalogEntry};
use app_core::{
    Agenda, AgendaEvent, AuthService, BadgeService, DisplayProfile, Notice, ProfileService,
    Sponsor, Sponsors, WorkshopAction, WorkshopDetails, WorkshopOperation, WorkshopService,
};
use app_state::QueryClient;
use app_ui::{guard, ColorScheme, GuardDecision, NavigationState, Router, ThemeContext};
use chrono::{DateTime, Utc};
use conference_client::{ConferenceAgent, ConferenceApi, SessionManager, WorkshopId};
use std::path::PathBuf;
use std::sync::Arc;
use storage::{DeviceStore, KvConfig, KvSecureStore, KvStore, SecureStore, ThemePreferenceStore};

/// Device store key of the device color scheme
pub const DEVICE_SCHEME_KEY: &str = "colorScheme";

/// The running companion
pub struct Companion {
    agenda: Agenda,
    sponsors: Sponsors,
    auth: AuthService,
    workshops: WorkshopService,
    profiles: ProfileService,
    badge: BadgeService,
    theme: ThemeContext,
    device: DeviceStore,
    router: Router,
    config: AppConfig,
    config_file: Option<PathBuf>,
}

impl std::fmt::Debug for Companion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Companion")
            .field("auth", &self.auth.state())
            .field("theme", &self.theme.state())
            .finish_non_exhaustive()
    }
}

impl Companion {
    /// Open the data directory and restore the stored session
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let data_dir = config.resolve_data_dir()?;
        let kv = KvStore::new(KvConfig::new(data_dir.join("store")))
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
        let secure: Arc<dyn SecureStore> = Arc::new(KvSecureStore::new(kv.clone()));
        let device = DeviceStore::new(kv);

        let api: Arc<dyn ConferenceApi> = Arc::new(
            ConferenceAgent::new(config.api_config(), secure.clone())
                .context("Failed to create API client")?,
        );

        let queries = QueryClient::new();
        let manager = Arc::new(SessionManager::new(api.clone(), secure.clone()));
        let auth = AuthService::new(manager, queries.clone());
        let state = auth.restore().await;
        tracing::debug!(authenticated = state.is_authenticated(), "session restored");

        let mut agenda = match &config.agenda_file {
            Some(path) => Agenda::load(path)?,
            None => Agenda::bundled()?,
        };
        if let Some(timezone) = config.timezone {
            agenda = agenda.with_timezone(timezone);
        }

        let device_scheme = device.get::<ColorScheme>(DEVICE_SCHEME_KEY).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to read device color scheme");
            None
        });
        let theme = ThemeContext::load(ThemePreferenceStore::new(secure), device_scheme.unwrap_or_default());

        Ok(Self {
            agenda,
            sponsors: Sponsors::bundled().context("Bundled sponsor list is invalid")?,
            workshops: WorkshopService::new(api.clone(), auth.clone(), queries.clone()),
            profiles: ProfileService::new(api.clone(), auth.clone(), queries),
            badge: BadgeService::new(api, auth.clone()),
            auth,
            theme,
            device,
            router: Router::new(),
            config: config.clone(),
            config_file: None,
        })
    }

    /// Use `path` instead of the platform default when saving the configuration
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    /// Effective configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Authentication service
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Run one command; `at` is the current instant for the agenda
    pub async fn run(&mut self, command: Commands, at: DateTime<Utc>) -> Result<String> {
        match command {
            Commands::Login(args) => self.login(args).await,
            Commands::Logout => self.logout().await,
            Commands::Whoami => self.whoami().await,
            Commands::Agenda(args) => self.agenda(args),
            Commands::Now => Ok(self.now(at)),
            Commands::Next => Ok(self.next(at)),
            Commands::Workshops(args) => self.workshops(args).await,
            Commands::Workshop(args) => self.workshop(&WorkshopId::new(args.id)).await,
            Commands::Enroll(args) => self.perform(&args.id, WorkshopOperation::Enroll).await,
            Commands::Unenroll(args) => self.perform(&args.id, WorkshopOperation::Unenroll).await,
            Commands::Waitlist(WaitlistCommand::Join(args)) => {
                self.perform(&args.id, WorkshopOperation::JoinWaitingList).await
            }
            Commands::Waitlist(WaitlistCommand::Leave(args)) => {
                self.perform(&args.id, WorkshopOperation::LeaveWaitingList).await
            }
            Commands::Badge(args) => self.badge(args).await,
            Commands::Cv => self.cv().await,
            Commands::Theme(args) => self.theme(args),
            Commands::Sponsors(args) => self.sponsors(args),
            Commands::Open(args) => Ok(self.open_path(args)),
            Commands::Config(args) => self.show_config(args),
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    async fn login(&self, args: LoginArgs) -> Result<String> {
        if let Err(err) = self.auth.sign_in(args.email.trim(), &args.password).await {
            bail!("{}", Notice::error(err.user_message()));
        }
        Ok(format!("Signed in as {}.", args.email.trim()))
    }

    async fn logout(&self) -> Result<String> {
        if let Err(err) = self.auth.sign_out().await {
            tracing::warn!(error = %err, "failed to delete stored token");
        }
        Ok("Signed out.".to_string())
    }

    async fn whoami(&self) -> Result<String> {
        let profile = match self.profiles.display_profile().await {
            Ok(profile) => profile,
            Err(err) => bail!("{}", Notice::error(err.user_message())),
        };
        let mut out = render_profile(&profile);

        if self.auth.is_authenticated() {
            let workshops = self.workshops.registered_workshops().await.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to load registered workshops");
                Vec::new()
            });
            out.push_str("\nMy workshops:\n");
            if workshops.is_empty() {
                out.push_str("  none\n");
            }
            for workshop in workshops {
                out.push_str(&format!(
                    "  [{}] {} ({})\n",
                    workshop.workshop_id,
                    workshop.title,
                    time_display(&workshop)
                ));
            }
        }
        Ok(out)
    }

    // =========================================================================
    // Agenda
    // =========================================================================

    fn agenda(&self, args: AgendaArgs) -> Result<String> {
        let days = self.agenda.days();
        let selected: Vec<_> = match &args.day {
            Some(id) => days.into_iter().filter(|d| &d.id == id).collect(),
            None => days,
        };
        if selected.is_empty() {
            match args.day {
                Some(id) => bail!("Unknown day: {}", id),
                None => return Ok("The agenda is empty.\n".to_string()),
            }
        }

        let mut out = String::new();
        for day in selected {
            out.push_str(&format!("== {} ==\n", day.label));
            for event in self.agenda.events_for_day(&day.id) {
                out.push_str(&render_event(event));
            }
        }
        Ok(out)
    }

    fn now(&self, at: DateTime<Utc>) -> String {
        let events = self.agenda.now(at);
        if events.is_empty() {
            return "Nothing is happening right now.\n".to_string();
        }
        events.into_iter().map(render_event).collect()
    }

    fn next(&self, at: DateTime<Utc>) -> String {
        let events = self.agenda.next(at);
        if events.is_empty() {
            return "Nothing else is scheduled today.\n".to_string();
        }
        events.into_iter().map(render_event).collect()
    }

    // =========================================================================
    // Workshops
    // =========================================================================

    async fn workshops(&self, args: WorkshopsArgs) -> Result<String> {
        let entries = match self.workshops.catalog(args.date, args.filter).await {
            Ok(entries) => entries,
            Err(err) => bail!("{}", Notice::from(&err)),
        };
        if entries.is_empty() {
            return Ok("No workshops found.\n".to_string());
        }
        Ok(entries.iter().map(render_catalog_entry).collect())
    }

    async fn workshop(&self, id: &WorkshopId) -> Result<String> {
        if let Err(err) = self.auth.require_token() {
            bail!("{}", Notice::error(err.user_message()));
        }
        let details = match self.workshops.details(id).await {
            Ok(details) => details,
            Err(err) => bail!("{}", Notice::from(&err)),
        };
        if details.workshop.is_none() {
            bail!("{}", Notice::error("Workshop not found."));
        }
        Ok(render_details(&details, self.auth.is_authenticated()))
    }

    async fn perform(&self, id: &str, operation: WorkshopOperation) -> Result<String> {
        match self.workshops.perform(&WorkshopId::new(id), operation).await {
            Ok(outcome) => Ok(format!(
                "{}\n\n{}",
                outcome.notice,
                render_details(&outcome.details, self.auth.is_authenticated())
            )),
            Err(err) => bail!("{}", Notice::from(&err)),
        }
    }

    // =========================================================================
    // Badge and CV
    // =========================================================================

    async fn badge(&self, args: BadgeArgs) -> Result<String> {
        let Some(image) = self.badge.fetch_image().await else {
            bail!("{}", Notice::error("QR code not available."));
        };
        match args.out {
            Some(path) => {
                std::fs::write(&path, &image.bytes)
                    .with_context(|| format!("Failed to write badge to {}", path.display()))?;
                Ok(format!("Badge saved to {}.", path.display()))
            }
            None => Ok(image.to_data_url()),
        }
    }

    async fn cv(&self) -> Result<String> {
        let status = self.profiles.cv_status().await;
        Ok(match status.view() {
            Ok(url) => format!("{}\n{}", status.file_name.as_deref().unwrap_or("CV"), url),
            Err(notice) => notice.to_string(),
        })
    }

    // =========================================================================
    // Theme, sponsors and deep links
    // =========================================================================

    fn theme(&mut self, args: ThemeArgs) -> Result<String> {
        if let Some(device) = args.device {
            let scheme = ColorScheme::from(device);
            self.device.set(DEVICE_SCHEME_KEY, &scheme).context("Failed to save device scheme")?;
            self.theme.set_device_scheme(scheme);
        }
        if let Some(preference) = args.preference {
            self.theme.set_preference(preference.into())?;
        }

        let colors = self.theme.colors();
        Ok(format!(
            "Theme: {} ({} scheme, text {} on {})",
            self.theme.preference(),
            if self.theme.is_dark() { "dark" } else { "light" },
            colors.text,
            colors.background
        ))
    }

    fn sponsors(&self, args: SponsorsArgs) -> Result<String> {
        if let Some(slug) = args.slug {
            return match self.sponsors.find(&slug) {
                Some(sponsor) => Ok(render_sponsor(sponsor)),
                None => bail!("Sponsor not found: {}", slug),
            };
        }

        let mut out = String::new();
        for (level, sponsors) in self.sponsors.by_level() {
            out.push_str(&format!("{}\n", level.heading()));
            for sponsor in sponsors {
                out.push_str(&format!("  {} ({})\n", sponsor.name, sponsor.slug));
            }
        }
        Ok(out)
    }

    fn show_config(&self, args: ConfigArgs) -> Result<String> {
        if !args.save {
            return serde_json::to_string_pretty(&self.config).context("Failed to encode configuration");
        }
        let path = match &self.config_file {
            Some(path) => path.clone(),
            None => AppConfig::config_path()
                .context("No configuration directory on this platform; pass --config")?,
        };
        self.config.save(&path)?;
        Ok(format!("Configuration saved to {}.", path.display()))
    }

    fn open_path(&self, args: OpenArgs) -> String {
        let requested = self.router.match_path(&args.path);
        let mut nav = NavigationState::new();
        match guard(&self.auth.state(), &requested) {
            GuardDecision::Stay => nav.navigate(requested),
            GuardDecision::Redirect(target) => {
                tracing::debug!(from = ?requested, to = ?target, "guard redirect");
                nav.replace(target);
            }
        }
        let route = nav.current_route();
        format!("{} ({})", route.title(), route.to_path())
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn render_event(event: &AgendaEvent) -> String {
    let location = event.location();
    if location.is_empty() {
        format!("  {:<20} {} [{}]\n", event.time, event.name, event.kind.label())
    } else {
        format!("  {:<20} {} [{}] @ {}\n", event.time, event.name, event.kind.label(), location)
    }
}

fn status_label(registered: bool, waiting_listed: bool, full: bool) -> &'static str {
    if registered {
        "registered"
    } else if waiting_listed {
        "waiting list"
    } else if full {
        "full"
    } else {
        "open"
    }
}

fn render_catalog_entry(entry: &CatalogEntry) -> String {
    let workshop = &entry.workshop;
    format!(
        "[{}] {} | {} {} | {}/{} | {}\n",
        workshop.workshop_id,
        workshop.title,
        workshop.date.as_deref().unwrap_or(app_core::workshops::TIME_TBD),
        time_display(workshop),
        workshop.spots_filled(),
        workshop.max_participants,
        status_label(entry.registered, entry.waiting_listed, workshop.is_full())
    )
}

fn render_details(details: &WorkshopDetails, authenticated: bool) -> String {
    let Some(workshop) = &details.workshop else {
        return "Workshop not found.\n".to_string();
    };

    let mut out = String::new();
    out.push_str(&format!("{}\n", workshop.title));
    out.push_str(&format!(
        "Date: {}  Time: {}\n",
        workshop.date.as_deref().unwrap_or(app_core::workshops::TIME_TBD),
        time_display(workshop)
    ));
    out.push_str(&format!("Spots: {}/{}\n", workshop.spots_filled(), workshop.max_participants));
    out.push_str(&format!(
        "Status: {}\n",
        status_label(details.registered, details.waiting_listed, details.is_full())
    ));
    if let Some(description) = workshop.description.as_deref().map(description_text) {
        if !description.is_empty() {
            out.push_str(&format!("\n{}\n", description));
        }
    }

    let action = details.action(authenticated);
    if action != WorkshopAction::SignInRequired {
        out.push_str(&format!("\nAction: {}\n", action.label()));
    }
    out
}

fn render_profile(profile: &DisplayProfile) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", profile.name, profile.role));
    out.push_str(&format!("Email:      {}\n", profile.email));
    out.push_str(&format!("University: {}\n", profile.university));
    out.push_str(&format!("School:     {}\n", profile.school));
    out.push_str(&format!("Year:       {}\n", profile.year));
    out.push_str(&format!("City:       {}\n", profile.city));
    out
}

fn render_sponsor(sponsor: &Sponsor) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", sponsor.name));
    out.push_str(&format!("{} sponsor\n", sponsor.level));
    if let Some(description) = sponsor.description() {
        out.push_str(&format!("\n{}\n", description));
    }
    for link in sponsor.links() {
        out.push_str(&format!("{}\n", link));
    }
    out
}
