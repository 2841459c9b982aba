//! Workshop registration
//!
//! This module assembles the workshop detail view from three concurrent reads
//! (the catalog, the attendee's enrollments and the attendee's waiting list)
//! and runs the four registration mutations. Every mutation applies an
//! optimistic flag, then re-fetches server truth; the server is the only
//! authority on availability.

use crate::auth::{AuthError, AuthService};
use crate::Notice;
use app_state::{MutationTracker, Query, QueryClient, QueryKey};
use async_trait::async_trait;
use chrono::NaiveDate;
use conference_client::{ConferenceApi, Workshop, WorkshopId, WorkshopRef};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Alert suffix used when the server gives no message
pub const RETRY_HINT: &str = "Please try again.";

/// Placeholder for an unknown time
pub const TIME_TBD: &str = "TBD";

// =============================================================================
// Errors
// =============================================================================

/// Workshop errors
#[derive(Debug, Error)]
pub enum WorkshopError {
    /// The attendee is not signed in
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// No workshop with this id in the catalog
    #[error("Workshop not found: {0}")]
    NotFound(WorkshopId),

    /// The operation does not apply in the current state
    #[error("{0} is not available for this workshop")]
    NotAllowed(WorkshopOperation),

    /// A registration request for this workshop is still in flight
    #[error("{0} already in progress")]
    Busy(WorkshopOperation),

    /// The server rejected the operation
    #[error("{operation} failed: {source}")]
    Failed {
        /// Attempted operation
        operation: WorkshopOperation,
        /// Client error
        #[source]
        source: conference_client::Error,
    },

    /// Loading workshop data failed
    #[error("Could not load workshops: {0}")]
    Load(#[from] conference_client::Error),
}

impl WorkshopError {
    /// Alert text for the attendee
    pub fn user_message(&self) -> String {
        match self {
            WorkshopError::Auth(err) => err.user_message(),
            WorkshopError::NotFound(_) => "Workshop not found.".to_string(),
            WorkshopError::NotAllowed(_) => {
                "This action is not available for this workshop.".to_string()
            }
            WorkshopError::Busy(_) => "Please wait for the current request to finish.".to_string(),
            WorkshopError::Failed { operation, source } => {
                let message = source.user_message();
                let message = if message.trim().is_empty() { RETRY_HINT } else { message.as_str() };
                format!("{}: {}", operation.failure_prefix(), message)
            }
            WorkshopError::Load(_) => {
                "Could not load workshop details. Please try again.".to_string()
            }
        }
    }
}

/// Result type for workshop operations
pub type Result<T> = std::result::Result<T, WorkshopError>;

// =============================================================================
// Operations and actions
// =============================================================================

/// Registration mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkshopOperation {
    /// Register for the workshop
    Enroll,
    /// Cancel a registration
    Unenroll,
    /// Queue for a full workshop
    JoinWaitingList,
    /// Leave the queue
    LeaveWaitingList,
}

impl WorkshopOperation {
    /// Alert prefix when the operation fails
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            WorkshopOperation::Enroll => "Enrollment failed",
            WorkshopOperation::Unenroll => "Unenrollment failed",
            WorkshopOperation::JoinWaitingList => "Failed to join waiting list",
            WorkshopOperation::LeaveWaitingList => "Failed to leave waiting list",
        }
    }

    /// Alert text when the operation succeeds
    pub fn success_message(&self) -> &'static str {
        match self {
            WorkshopOperation::Enroll => "You have been registered for the workshop!",
            WorkshopOperation::Unenroll => "You have unenrolled from the workshop.",
            WorkshopOperation::JoinWaitingList => "You have joined the waiting list.",
            WorkshopOperation::LeaveWaitingList => "You have left the waiting list.",
        }
    }
}

impl fmt::Display for WorkshopOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkshopOperation::Enroll => "Enrollment",
            WorkshopOperation::Unenroll => "Unenrollment",
            WorkshopOperation::JoinWaitingList => "Joining the waiting list",
            WorkshopOperation::LeaveWaitingList => "Leaving the waiting list",
        };
        f.write_str(name)
    }
}

/// The single action offered on the detail screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkshopAction {
    /// Signed out; the button leads to sign-in
    SignInRequired,
    /// Registered; offer to leave
    Leave,
    /// Full and queued; offer to leave the queue
    LeaveWaitingList,
    /// Full and not queued; offer to queue
    JoinWaitingList,
    /// Places left; offer to register
    Register,
}

impl WorkshopAction {
    /// Button label
    pub fn label(&self) -> &'static str {
        match self {
            WorkshopAction::SignInRequired => "Log In to Register",
            WorkshopAction::Leave => "Leave Workshop",
            WorkshopAction::LeaveWaitingList => "Leave Waiting List",
            WorkshopAction::JoinWaitingList => "Join Waiting List",
            WorkshopAction::Register => "Register",
        }
    }

    /// Mutation run by the button, if any
    pub fn operation(&self) -> Option<WorkshopOperation> {
        match self {
            WorkshopAction::SignInRequired => None,
            WorkshopAction::Leave => Some(WorkshopOperation::Unenroll),
            WorkshopAction::LeaveWaitingList => Some(WorkshopOperation::LeaveWaitingList),
            WorkshopAction::JoinWaitingList => Some(WorkshopOperation::JoinWaitingList),
            WorkshopAction::Register => Some(WorkshopOperation::Enroll),
        }
    }
}

// =============================================================================
// Details
// =============================================================================

/// Workshop as seen by the signed-in attendee
#[derive(Debug, Clone, PartialEq)]
pub struct WorkshopDetails {
    /// Requested id
    pub id: WorkshopId,
    /// Catalog entry, `None` when the id is unknown
    pub workshop: Option<Workshop>,
    /// The attendee holds a place
    pub registered: bool,
    /// The attendee is on the waiting list
    pub waiting_listed: bool,
}

impl WorkshopDetails {
    /// Combine the three server lists for one workshop
    pub fn assemble(
        id: WorkshopId,
        workshops: &[Workshop],
        enrolled: &[WorkshopRef],
        waiting: &[WorkshopRef],
    ) -> Self {
        let workshop = workshops.iter().find(|w| w.workshop_id == id).cloned();
        let found = workshop.is_some();
        let contains = |refs: &[WorkshopRef]| refs.iter().any(|r| r.workshop_id == id);

        Self {
            registered: found && contains(enrolled),
            waiting_listed: found && contains(waiting),
            workshop,
            id,
        }
    }

    /// No places left
    pub fn is_full(&self) -> bool {
        self.workshop.as_ref().is_some_and(Workshop::is_full)
    }

    /// Places taken
    pub fn spots_filled(&self) -> Option<i64> {
        self.workshop.as_ref().map(Workshop::spots_filled)
    }

    /// Action offered to the attendee
    pub fn action(&self, authenticated: bool) -> WorkshopAction {
        if !authenticated {
            WorkshopAction::SignInRequired
        } else if self.registered {
            WorkshopAction::Leave
        } else if self.is_full() {
            if self.waiting_listed {
                WorkshopAction::LeaveWaitingList
            } else {
                WorkshopAction::JoinWaitingList
            }
        } else {
            WorkshopAction::Register
        }
    }

    fn permits(&self, operation: WorkshopOperation) -> bool {
        if self.workshop.is_none() {
            return false;
        }
        match operation {
            WorkshopOperation::Enroll => !self.is_full() && !self.registered,
            WorkshopOperation::Unenroll => self.registered,
            WorkshopOperation::JoinWaitingList => {
                self.is_full() && !self.registered && !self.waiting_listed
            }
            WorkshopOperation::LeaveWaitingList => self.waiting_listed,
        }
    }

    fn apply(&mut self, operation: WorkshopOperation) {
        match operation {
            WorkshopOperation::Enroll => self.registered = true,
            WorkshopOperation::Unenroll => self.registered = false,
            WorkshopOperation::JoinWaitingList => self.waiting_listed = true,
            WorkshopOperation::LeaveWaitingList => self.waiting_listed = false,
        }
    }
}

/// Result of a successful mutation
#[derive(Debug, Clone, PartialEq)]
pub struct WorkshopOutcome {
    /// Details after the re-fetch
    pub details: WorkshopDetails,
    /// Success alert
    pub notice: Notice,
}

// =============================================================================
// Catalog
// =============================================================================

/// Status filter of the workshop list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkshopFilter {
    /// Every workshop
    #[default]
    All,
    /// Workshops the attendee is registered for
    Registered,
    /// Workshops the attendee is queued for
    WaitingList,
}

impl FromStr for WorkshopFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(WorkshopFilter::All),
            "registered" => Ok(WorkshopFilter::Registered),
            "waiting" | "waiting-list" | "waitlist" => Ok(WorkshopFilter::WaitingList),
            other => Err(format!("unknown workshop filter: {}", other)),
        }
    }
}

/// Catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Workshop
    pub workshop: Workshop,
    /// The attendee holds a place
    pub registered: bool,
    /// The attendee is on the waiting list
    pub waiting_listed: bool,
}

/// Filter by date and status, then sort by start time
///
/// Workshops without a parsable start time sort last.
pub fn build_catalog(
    workshops: Vec<Workshop>,
    enrolled: &[WorkshopRef],
    waiting: &[WorkshopRef],
    date: Option<NaiveDate>,
    filter: WorkshopFilter,
) -> Vec<CatalogEntry> {
    let enrolled: HashSet<&WorkshopId> = enrolled.iter().map(|r| &r.workshop_id).collect();
    let waiting: HashSet<&WorkshopId> = waiting.iter().map(|r| &r.workshop_id).collect();

    let mut entries: Vec<CatalogEntry> = workshops
        .into_iter()
        .filter(|w| date.is_none() || w.calendar_date() == date)
        .map(|w| CatalogEntry {
            registered: enrolled.contains(&w.workshop_id),
            waiting_listed: waiting.contains(&w.workshop_id),
            workshop: w,
        })
        .filter(|e| match filter {
            WorkshopFilter::All => true,
            WorkshopFilter::Registered => e.registered,
            WorkshopFilter::WaitingList => e.waiting_listed,
        })
        .collect();

    entries.sort_by_key(|e| {
        let start = e.workshop.start_time();
        (start.is_none(), start)
    });
    entries
}

/// `"HH:MM - HH:MM"`, with `TBD` for missing times
pub fn time_display(workshop: &Workshop) -> String {
    match (workshop.start_hhmm(), workshop.end_hhmm()) {
        (Some(start), Some(end)) => format!("{} - {}", start, end),
        (Some(start), None) => format!("{} - {}", start, TIME_TBD),
        (None, _) => TIME_TBD.to_string(),
    }
}

/// Plain text rendering of an HTML description
pub fn description_text(html: &str) -> String {
    static BREAK_REGEX: OnceLock<Regex> = OnceLock::new();
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    static BLANK_LINES_REGEX: OnceLock<Regex> = OnceLock::new();

    let breaks = BREAK_REGEX
        .get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>|</li\s*>|</h[1-6]\s*>").unwrap());
    let tags = TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
    let blank_lines = BLANK_LINES_REGEX.get_or_init(|| Regex::new(r"\n\s*\n+").unwrap());

    let text = breaks.replace_all(html, "\n");
    let text = tags.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    blank_lines.replace_all(lines.join("\n").trim(), "\n\n").into_owned()
}

// =============================================================================
// Queries
// =============================================================================

/// Query keys of the workshop scope
pub mod keys {
    use super::*;

    /// Query scope shared by all workshop data
    pub const SCOPE: &str = "workshops";

    /// The full catalog
    pub fn catalog() -> QueryKey {
        QueryKey::new(SCOPE, "all")
    }

    /// The attendee's enrollments
    pub fn enrolled() -> QueryKey {
        QueryKey::new(SCOPE, "enrolled")
    }

    /// The attendee's waiting list
    pub fn waiting_list() -> QueryKey {
        QueryKey::new(SCOPE, "waiting-list")
    }

    /// Assembled details of one workshop
    pub fn details(id: &WorkshopId) -> QueryKey {
        QueryKey::new(SCOPE, "details").with_param("id", id.as_str())
    }
}

struct CatalogQuery {
    api: Arc<dyn ConferenceApi>,
}

#[async_trait]
impl Query for CatalogQuery {
    type Data = Vec<Workshop>;
    type Error = conference_client::Error;

    async fn fetch(&self) -> std::result::Result<Self::Data, Self::Error> {
        self.api.list_workshops().await
    }

    fn key(&self) -> QueryKey {
        keys::catalog()
    }
}

#[derive(Clone, Copy)]
enum Membership {
    Enrolled,
    WaitingList,
}

struct MembershipQuery {
    api: Arc<dyn ConferenceApi>,
    membership: Membership,
}

#[async_trait]
impl Query for MembershipQuery {
    type Data = Vec<WorkshopRef>;
    type Error = conference_client::Error;

    async fn fetch(&self) -> std::result::Result<Self::Data, Self::Error> {
        match self.membership {
            Membership::Enrolled => self.api.user_workshops().await,
            Membership::WaitingList => self.api.user_waiting_list().await,
        }
    }

    fn key(&self) -> QueryKey {
        match self.membership {
            Membership::Enrolled => keys::enrolled(),
            Membership::WaitingList => keys::waiting_list(),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

fn mutation_key(id: &WorkshopId) -> String {
    format!("workshop:{}", id)
}

/// Workshop registration service
#[derive(Clone)]
pub struct WorkshopService {
    api: Arc<dyn ConferenceApi>,
    auth: AuthService,
    queries: QueryClient,
    mutations: MutationTracker,
}

impl fmt::Debug for WorkshopService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkshopService")
            .field("queries", &self.queries)
            .field("pending", &self.mutations.pending_count())
            .finish()
    }
}

impl WorkshopService {
    /// Create a new workshop service
    pub fn new(api: Arc<dyn ConferenceApi>, auth: AuthService, queries: QueryClient) -> Self {
        Self { api, auth, queries, mutations: MutationTracker::new() }
    }

    /// In-flight registration requests
    pub fn mutations(&self) -> &MutationTracker {
        &self.mutations
    }

    /// Whether a registration request for this workshop is in flight
    pub fn is_busy(&self, id: &WorkshopId) -> bool {
        self.mutations.is_pending(&mutation_key(id))
    }

    /// Load the detail view
    ///
    /// The three reads run concurrently; any failure fails the whole load.
    pub async fn details(&self, id: &WorkshopId) -> Result<WorkshopDetails> {
        self.auth.require_token()?;

        let catalog = CatalogQuery { api: self.api.clone() };
        let enrolled = MembershipQuery { api: self.api.clone(), membership: Membership::Enrolled };
        let waiting = MembershipQuery { api: self.api.clone(), membership: Membership::WaitingList };

        let (workshops, enrolled, waiting) = tokio::try_join!(
            self.queries.get(&catalog),
            self.queries.get(&enrolled),
            self.queries.get(&waiting),
        )?;

        let details = WorkshopDetails::assemble(id.clone(), &workshops, &enrolled, &waiting);
        self.queries.set_data(&keys::details(id), details.clone());
        Ok(details)
    }

    /// Register for a workshop with places left
    pub async fn enroll(&self, id: &WorkshopId) -> Result<WorkshopOutcome> {
        self.perform(id, WorkshopOperation::Enroll).await
    }

    /// Cancel a registration
    pub async fn unenroll(&self, id: &WorkshopId) -> Result<WorkshopOutcome> {
        self.perform(id, WorkshopOperation::Unenroll).await
    }

    /// Queue for a full workshop
    pub async fn join_waiting_list(&self, id: &WorkshopId) -> Result<WorkshopOutcome> {
        self.perform(id, WorkshopOperation::JoinWaitingList).await
    }

    /// Leave the waiting list
    pub async fn leave_waiting_list(&self, id: &WorkshopId) -> Result<WorkshopOutcome> {
        self.perform(id, WorkshopOperation::LeaveWaitingList).await
    }

    /// Run a registration mutation
    ///
    /// Preconditions are checked against the last loaded details (loading
    /// them first if needed). On success the optimistic flag is applied and
    /// the details are re-fetched; a failed re-fetch keeps the optimistic
    /// view.
    pub async fn perform(
        &self,
        id: &WorkshopId,
        operation: WorkshopOperation,
    ) -> Result<WorkshopOutcome> {
        self.auth.require_token()?;

        let guard = self
            .mutations
            .begin(mutation_key(id))
            .map_err(|_| WorkshopError::Busy(operation))?;

        let mut current = match self.queries.peek::<WorkshopDetails>(&keys::details(id)) {
            Some(details) => details,
            None => self.details(id).await?,
        };

        if current.workshop.is_none() {
            return Err(WorkshopError::NotFound(id.clone()));
        }
        if !current.permits(operation) {
            return Err(WorkshopError::NotAllowed(operation));
        }

        let result = match operation {
            WorkshopOperation::Enroll => self.api.enroll(id).await,
            WorkshopOperation::Unenroll => self.api.unenroll(id).await,
            WorkshopOperation::JoinWaitingList => self.api.join_waiting_list(id).await,
            WorkshopOperation::LeaveWaitingList => self.api.leave_waiting_list(id).await,
        };

        if let Err(source) = result {
            tracing::warn!(workshop = %id, %operation, error = %source, "workshop mutation failed");
            guard.finish(false);
            return Err(WorkshopError::Failed { operation, source });
        }

        tracing::info!(workshop = %id, %operation, "workshop mutation succeeded");

        current.apply(operation);
        self.queries.set_data(&keys::details(id), current.clone());
        self.invalidate_lists();

        let details = match self.details(id).await {
            Ok(details) => details,
            Err(err) => {
                tracing::warn!(workshop = %id, error = %err, "refresh after mutation failed");
                current
            }
        };

        guard.finish(true);
        Ok(WorkshopOutcome { details, notice: Notice::success(operation.success_message()) })
    }

    /// Workshop list for the catalog screen
    ///
    /// Signed-out attendees can browse `All`; the status filters need a
    /// session.
    pub async fn catalog(
        &self,
        date: Option<NaiveDate>,
        filter: WorkshopFilter,
    ) -> Result<Vec<CatalogEntry>> {
        let catalog = CatalogQuery { api: self.api.clone() };

        if !self.auth.is_authenticated() {
            if filter != WorkshopFilter::All {
                return Err(AuthError::NotAuthenticated.into());
            }
            let workshops = self.queries.get(&catalog).await?;
            return Ok(build_catalog(workshops, &[], &[], date, filter));
        }

        let enrolled = MembershipQuery { api: self.api.clone(), membership: Membership::Enrolled };
        let waiting = MembershipQuery { api: self.api.clone(), membership: Membership::WaitingList };

        let (workshops, enrolled, waiting) = tokio::try_join!(
            self.queries.get(&catalog),
            self.queries.get(&enrolled),
            self.queries.get(&waiting),
        )?;

        Ok(build_catalog(workshops, &enrolled, &waiting, date, filter))
    }

    /// Workshops the attendee is registered for, for the profile screen
    pub async fn registered_workshops(&self) -> Result<Vec<Workshop>> {
        self.auth.require_token()?;
        let entries = self.catalog(None, WorkshopFilter::Registered).await?;
        Ok(entries.into_iter().map(|e| e.workshop).collect())
    }

    fn invalidate_lists(&self) {
        self.queries.invalidate(&keys::catalog());
        self.queries.invalidate(&keys::enrolled());
        self.queries.invalidate(&keys::waiting_list());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoticeLevel;
    use app_state::MutationState;
    use conference_client::test_utils::{ack, workshops as fixtures, MockConferenceBackend};
    use conference_client::{
        Ack, ApiError, BadgeImage, CvDocument, LoginResponse, Result as ClientResult,
        SessionManager, UserProfile, WorkshopRef,
    };
    use tokio::sync::Notify;
    use storage::{MemorySecureStore, SecureStore, SESSION_TOKEN_KEY};

    async fn service_with(api: MockConferenceBackend, signed_in: bool) -> WorkshopService {
        service_over(Arc::new(api), signed_in).await
    }

    async fn service_over(api: Arc<dyn ConferenceApi>, signed_in: bool) -> WorkshopService {
        let store = Arc::new(MemorySecureStore::new());
        if signed_in {
            store.set_item(SESSION_TOKEN_KEY, "token").unwrap();
        }

        let queries = QueryClient::new();
        let manager = Arc::new(SessionManager::new(api.clone(), store));
        let auth = AuthService::new(manager, queries.clone());
        auth.restore().await;
        WorkshopService::new(api, auth, queries)
    }

    async fn service(api: MockConferenceBackend) -> WorkshopService {
        service_with(api, true).await
    }

    /// Backend whose enroll call parks until the gate opens
    struct GatedBackend {
        inner: MockConferenceBackend,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ConferenceApi for GatedBackend {
        async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
            self.inner.login(email, password).await
        }
        async fn logout(&self) -> ClientResult<Ack> {
            self.inner.logout().await
        }
        async fn profile(&self) -> ClientResult<UserProfile> {
            self.inner.profile().await
        }
        async fn cv(&self) -> ClientResult<CvDocument> {
            self.inner.cv().await
        }
        async fn qr_code(&self) -> ClientResult<BadgeImage> {
            self.inner.qr_code().await
        }
        async fn list_workshops(&self) -> ClientResult<Vec<Workshop>> {
            self.inner.list_workshops().await
        }
        async fn enroll(&self, id: &WorkshopId) -> ClientResult<Ack> {
            self.gate.notified().await;
            self.inner.enroll(id).await
        }
        async fn unenroll(&self, id: &WorkshopId) -> ClientResult<Ack> {
            self.inner.unenroll(id).await
        }
        async fn join_waiting_list(&self, id: &WorkshopId) -> ClientResult<Ack> {
            self.inner.join_waiting_list(id).await
        }
        async fn leave_waiting_list(&self, id: &WorkshopId) -> ClientResult<Ack> {
            self.inner.leave_waiting_list(id).await
        }
        async fn user_workshops(&self) -> ClientResult<Vec<WorkshopRef>> {
            self.inner.user_workshops().await
        }
        async fn user_waiting_list(&self) -> ClientResult<Vec<WorkshopRef>> {
            self.inner.user_waiting_list().await
        }
    }

    fn catalog(api: &mut MockConferenceBackend) {
        api.expect_list_workshops()
            .returning(|| Ok(vec![fixtures::open("1"), fixtures::full("2")]));
    }

    fn details(workshop: Workshop, registered: bool, waiting_listed: bool) -> WorkshopDetails {
        WorkshopDetails {
            id: workshop.workshop_id.clone(),
            workshop: Some(workshop),
            registered,
            waiting_listed,
        }
    }

    // =========================================================================
    // Details
    // =========================================================================

    #[tokio::test]
    async fn test_details_derives_membership() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![fixtures::reference("1")]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));

        let service = service(api).await;
        let details = service.details(&WorkshopId::new("1")).await.unwrap();

        assert!(details.registered);
        assert!(!details.waiting_listed);
        assert_eq!(details.spots_filled(), Some(15));
        assert_eq!(details.action(true), WorkshopAction::Leave);
    }

    #[tokio::test]
    async fn test_details_unknown_workshop() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![fixtures::reference("9")]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));
        api.expect_enroll().never();

        let service = service(api).await;
        let id = WorkshopId::new("9");
        let details = service.details(&id).await.unwrap();
        assert!(details.workshop.is_none());
        assert!(!details.registered);

        let err = service.enroll(&id).await.unwrap_err();
        assert!(matches!(err, WorkshopError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_details_requires_sign_in() {
        let service = service_with(MockConferenceBackend::new(), false).await;
        let err = service.details(&WorkshopId::new("1")).await.unwrap_err();
        assert!(matches!(err, WorkshopError::Auth(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_details_load_failure() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Err(ApiError::network("offline").into()));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));

        let service = service(api).await;
        let err = service.details(&WorkshopId::new("1")).await.unwrap_err();
        assert_eq!(err.user_message(), "Could not load workshop details. Please try again.");
    }

    #[test]
    fn test_action_for_each_state() {
        let open = details(fixtures::open("1"), false, false);
        let full = details(fixtures::full("2"), false, false);

        assert_eq!(open.action(false), WorkshopAction::SignInRequired);
        assert_eq!(open.action(true), WorkshopAction::Register);
        assert_eq!(full.action(true), WorkshopAction::JoinWaitingList);
        assert_eq!(details(fixtures::full("2"), false, true).action(true), WorkshopAction::LeaveWaitingList);
        assert_eq!(details(fixtures::full("2"), true, false).action(true), WorkshopAction::Leave);

        assert_eq!(WorkshopAction::Register.operation(), Some(WorkshopOperation::Enroll));
        assert_eq!(WorkshopAction::SignInRequired.operation(), None);
    }

    #[test]
    fn test_negative_availability_is_full() {
        let details = details(fixtures::workshop("3", -2, 10), false, false);
        assert!(details.is_full());
        assert_eq!(details.spots_filled(), Some(12));
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    #[tokio::test]
    async fn test_enroll_refetches_server_state() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        let mut calls = 0;
        api.expect_user_workshops().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(vec![])
            } else {
                Ok(vec![fixtures::reference("1")])
            }
        });
        api.expect_user_waiting_list().returning(|| Ok(vec![]));
        api.expect_enroll()
            .withf(|id| id.as_str() == "1")
            .times(1)
            .returning(|_| Ok(ack("Enrolled")));

        let service = service(api).await;
        let id = WorkshopId::new("1");
        let outcome = service.enroll(&id).await.unwrap();

        assert!(outcome.details.registered);
        assert_eq!(outcome.notice.level, NoticeLevel::Success);
        assert_eq!(outcome.notice.message, "You have been registered for the workshop!");
        assert_eq!(service.mutations().state(&mutation_key(&id)), MutationState::Success);
    }

    #[tokio::test]
    async fn test_enroll_full_workshop_not_allowed() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));
        api.expect_enroll().never();

        let service = service(api).await;
        let err = service.enroll(&WorkshopId::new("2")).await.unwrap_err();
        assert!(matches!(err, WorkshopError::NotAllowed(WorkshopOperation::Enroll)));
        assert!(!service.is_busy(&WorkshopId::new("2")));
    }

    #[tokio::test]
    async fn test_unenroll_requires_registration() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));
        api.expect_unenroll().never();

        let service = service(api).await;
        let err = service.unenroll(&WorkshopId::new("1")).await.unwrap_err();
        assert!(matches!(err, WorkshopError::NotAllowed(WorkshopOperation::Unenroll)));
    }

    #[tokio::test]
    async fn test_enroll_failure_alert_uses_server_message() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));
        api.expect_enroll()
            .returning(|_| Err(ApiError::new(422, "HTTP422", "Workshop is full").into()));

        let service = service(api).await;
        let id = WorkshopId::new("1");
        let err = service.enroll(&id).await.unwrap_err();

        assert_eq!(err.user_message(), "Enrollment failed: Workshop is full");
        assert_eq!(service.mutations().state(&mutation_key(&id)), MutationState::Error);
    }

    #[tokio::test]
    async fn test_failure_without_message_suggests_retry() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));
        api.expect_join_waiting_list()
            .returning(|_| Err(ApiError::new(500, "HTTP500", "").into()));

        let service = service(api).await;
        let err = service.join_waiting_list(&WorkshopId::new("2")).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to join waiting list: Please try again.");
    }

    #[tokio::test]
    async fn test_busy_while_request_in_flight() {
        let mut api = MockConferenceBackend::new();
        api.expect_enroll().never();

        let service = service(api).await;
        let id = WorkshopId::new("1");
        let _pending = service.mutations().begin(mutation_key(&id)).unwrap();

        assert!(service.is_busy(&id));
        let err = service.enroll(&id).await.unwrap_err();
        assert!(matches!(err, WorkshopError::Busy(WorkshopOperation::Enroll)));
    }

    #[tokio::test]
    async fn test_overlapping_enroll_rejected_while_first_in_flight() {
        let mut inner = MockConferenceBackend::new();
        catalog(&mut inner);
        inner.expect_user_workshops().returning(|| Ok(vec![]));
        inner.expect_user_waiting_list().returning(|| Ok(vec![]));
        inner.expect_enroll().times(1).returning(|_| Ok(ack("Enrolled")));

        let gate = Arc::new(Notify::new());
        let service =
            service_over(Arc::new(GatedBackend { inner, gate: gate.clone() }), true).await;
        let id = WorkshopId::new("1");
        service.details(&id).await.unwrap();

        let first = service.enroll(&id);
        let second = async {
            // Let the first request reach the gate.
            tokio::task::yield_now().await;
            assert!(service.is_busy(&id));
            let result = service.enroll(&id).await;
            gate.notify_one();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(WorkshopError::Busy(WorkshopOperation::Enroll))));
        assert!(!service.is_busy(&id));
        assert_eq!(service.mutations().state(&mutation_key(&id)), MutationState::Success);
    }

    #[tokio::test]
    async fn test_leave_waiting_list_requires_queue_entry() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));
        api.expect_leave_waiting_list().never();

        let service = service(api).await;
        let id = WorkshopId::new("2");
        let err = service.leave_waiting_list(&id).await.unwrap_err();

        assert!(matches!(err, WorkshopError::NotAllowed(WorkshopOperation::LeaveWaitingList)));
        assert_eq!(service.mutations().state(&mutation_key(&id)), MutationState::Idle);
    }

    #[tokio::test]
    async fn test_join_and_leave_waiting_list() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![]));
        let mut calls = 0;
        api.expect_user_waiting_list().returning(move || {
            calls += 1;
            // load, refetch after join, refetch after leave
            if calls == 2 {
                Ok(vec![fixtures::reference("2")])
            } else {
                Ok(vec![])
            }
        });
        api.expect_join_waiting_list().times(1).returning(|_| Ok(ack("Joined")));
        api.expect_leave_waiting_list().times(1).returning(|_| Ok(Default::default()));

        let service = service(api).await;
        let id = WorkshopId::new("2");

        let joined = service.join_waiting_list(&id).await.unwrap();
        assert!(joined.details.waiting_listed);
        assert_eq!(joined.details.action(true), WorkshopAction::LeaveWaitingList);

        let left = service.leave_waiting_list(&id).await.unwrap();
        assert!(!left.details.waiting_listed);
        assert_eq!(left.notice.message, "You have left the waiting list.");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_optimistic_state() {
        let mut api = MockConferenceBackend::new();
        let mut calls = 0;
        api.expect_list_workshops().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(vec![fixtures::open("1")])
            } else {
                Err(ApiError::network("offline").into())
            }
        });
        api.expect_user_workshops().returning(|| Ok(vec![fixtures::reference("1")]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));
        api.expect_unenroll().times(1).returning(|_| Ok(ack("Unenrolled")));

        let service = service(api).await;
        let outcome = service.unenroll(&WorkshopId::new("1")).await.unwrap();
        assert!(!outcome.details.registered);
        assert_eq!(outcome.notice.message, "You have unenrolled from the workshop.");
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    #[test]
    fn test_build_catalog_filters_and_sorts() {
        let mut late = fixtures::open("1");
        late.hour = Some("15:00:00".to_string());
        let mut early = fixtures::full("2");
        early.hour = Some("09:30:00".to_string());
        let mut untimed = fixtures::open("3");
        untimed.hour = None;
        let mut other_day = fixtures::open("4");
        other_day.date = Some("2025-04-27".to_string());

        let workshops = vec![late, untimed, early, other_day];
        let day = NaiveDate::from_ymd_opt(2025, 4, 26);

        let all = build_catalog(workshops.clone(), &[], &[], day, WorkshopFilter::All);
        let ids: Vec<&str> = all.iter().map(|e| e.workshop.workshop_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);

        let registered = build_catalog(
            workshops.clone(),
            &[fixtures::reference("1"), fixtures::reference("4")],
            &[],
            day,
            WorkshopFilter::Registered,
        );
        assert_eq!(registered.len(), 1);
        assert!(registered[0].registered);

        let waiting = build_catalog(
            workshops,
            &[],
            &[fixtures::reference("2")],
            None,
            WorkshopFilter::WaitingList,
        );
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].workshop.workshop_id.as_str(), "2");
    }

    #[tokio::test]
    async fn test_signed_out_catalog() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().never();

        let service = service_with(api, false).await;
        let all = service.catalog(None, WorkshopFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| !e.registered));

        let err = service.catalog(None, WorkshopFilter::Registered).await.unwrap_err();
        assert!(matches!(err, WorkshopError::Auth(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_registered_workshops() {
        let mut api = MockConferenceBackend::new();
        catalog(&mut api);
        api.expect_user_workshops().returning(|| Ok(vec![fixtures::reference("2")]));
        api.expect_user_waiting_list().returning(|| Ok(vec![]));

        let service = service(api).await;
        let registered = service.registered_workshops().await.unwrap();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].workshop_id.as_str(), "2");
    }

    #[test]
    fn test_filter_from_str() {
        assert_eq!("all".parse::<WorkshopFilter>().unwrap(), WorkshopFilter::All);
        assert_eq!("Registered".parse::<WorkshopFilter>().unwrap(), WorkshopFilter::Registered);
        assert_eq!("waitlist".parse::<WorkshopFilter>().unwrap(), WorkshopFilter::WaitingList);
        assert!("checkin".parse::<WorkshopFilter>().is_err());
    }

    // =========================================================================
    // Formatting
    // =========================================================================

    #[test]
    fn test_time_display() {
        let mut workshop = fixtures::open("1");
        assert_eq!(time_display(&workshop), "10:00 - 12:00");

        workshop.end_time = None;
        assert_eq!(time_display(&workshop), "10:00 - TBD");

        workshop.hour = None;
        assert_eq!(time_display(&workshop), "TBD");
    }

    #[test]
    fn test_description_text() {
        let html = "<p>Build a <strong>PCB</strong> &amp; solder it.</p><p>Bring:<br/>a laptop</p>";
        assert_eq!(description_text(html), "Build a PCB & solder it.\nBring:\na laptop");
        assert_eq!(description_text(""), "");
    }
}
