//! Navigation for the conference companion
//!
//! This module provides:
//! - Route definitions and path matching for deep links
//! - The authentication guard that keeps signed-out visitors on sign-in
//! - Per-tab navigation stacks

use app_state::AuthState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Route Definitions
// =============================================================================

/// All routes of the application
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "route", content = "params")]
pub enum Route {
    /// Sign-in screen
    SignIn,

    // Tabs
    /// Home with sponsors
    #[default]
    Home,
    /// Conference schedule
    Agenda,
    /// Workshop list
    Workshops,
    /// QR badge
    Badge,
    /// Attendee profile
    Profile,

    /// Workshop details
    WorkshopDetails {
        /// Workshop id
        id: String,
    },
    /// Sponsor details
    SponsorDetails {
        /// Sponsor slug
        slug: String,
    },

    /// Unknown path
    NotFound,
}

/// Where a route lives, for the auth guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGroup {
    /// The sign-in screen
    SignIn,
    /// One of the tab roots
    Tabs,
    /// A workshop page
    Workshop,
    /// Anything else
    Other,
}

impl Route {
    /// Convert route to URL path
    pub fn to_path(&self) -> String {
        match self {
            Route::SignIn => "/sign-in".to_string(),
            Route::Home => "/".to_string(),
            Route::Agenda => "/agenda".to_string(),
            Route::Workshops => "/workshops".to_string(),
            Route::Badge => "/qrcode".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::WorkshopDetails { id } => format!("/workshop/{}", urlencoding::encode(id)),
            Route::SponsorDetails { slug } => format!("/sponsor/{}", urlencoding::encode(slug)),
            Route::NotFound => "/+not-found".to_string(),
        }
    }

    /// Group used by the auth guard
    pub fn group(&self) -> RouteGroup {
        match self {
            Route::SignIn => RouteGroup::SignIn,
            Route::Home | Route::Agenda | Route::Workshops | Route::Badge | Route::Profile => {
                RouteGroup::Tabs
            }
            Route::WorkshopDetails { .. } => RouteGroup::Workshop,
            Route::SponsorDetails { .. } | Route::NotFound => RouteGroup::Other,
        }
    }

    /// Screen title
    pub fn title(&self) -> &'static str {
        match self {
            Route::SignIn => "Sign In",
            Route::Home => "Home",
            Route::Agenda => "Schedule",
            Route::Workshops => "Workshops",
            Route::Badge => "QR Code",
            Route::Profile => "Profile",
            Route::WorkshopDetails { .. } => "Workshop Details",
            Route::SponsorDetails { .. } => "Sponsor",
            Route::NotFound => "Not Found",
        }
    }
}

// =============================================================================
// Auth Guard
// =============================================================================

/// Outcome of the auth guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Leave the current route alone
    Stay,
    /// Replace the current route
    Redirect(Route),
}

/// Decide where the attendee may be
///
/// Nothing happens while the session is still being restored. Signed-in
/// attendees outside the tabs and workshop pages go home; signed-out
/// visitors go to sign-in.
pub fn guard(auth: &AuthState, route: &Route) -> GuardDecision {
    if auth.is_loading {
        return GuardDecision::Stay;
    }

    let group = route.group();
    if auth.is_authenticated() {
        if group != RouteGroup::Tabs && group != RouteGroup::Workshop {
            return GuardDecision::Redirect(Route::Home);
        }
    } else if group != RouteGroup::SignIn {
        return GuardDecision::Redirect(Route::SignIn);
    }

    GuardDecision::Stay
}

// =============================================================================
// Navigation Tabs
// =============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NavigationTab {
    /// Home tab
    #[default]
    Home,
    /// Schedule tab
    Agenda,
    /// Badge tab
    Badge,
    /// Workshops tab
    Workshops,
    /// Profile tab
    Profile,
}

impl NavigationTab {
    /// Get the root route for this tab
    pub fn root_route(&self) -> Route {
        match self {
            NavigationTab::Home => Route::Home,
            NavigationTab::Agenda => Route::Agenda,
            NavigationTab::Badge => Route::Badge,
            NavigationTab::Workshops => Route::Workshops,
            NavigationTab::Profile => Route::Profile,
        }
    }

    /// Tab owning a tab root route
    pub fn for_route(route: &Route) -> Option<NavigationTab> {
        NavigationTab::all().into_iter().find(|tab| tab.root_route() == *route)
    }

    /// Get icon name for this tab
    pub fn icon(&self) -> &'static str {
        match self {
            NavigationTab::Home => "house.fill",
            NavigationTab::Agenda => "calendar",
            NavigationTab::Badge => "qrcode",
            NavigationTab::Workshops => "person.2.fill",
            NavigationTab::Profile => "person.fill",
        }
    }

    /// Get label for this tab
    pub fn label(&self) -> &'static str {
        self.root_route().title()
    }

    /// Get all tabs in order
    pub fn all() -> [NavigationTab; 5] {
        [
            NavigationTab::Home,
            NavigationTab::Agenda,
            NavigationTab::Badge,
            NavigationTab::Workshops,
            NavigationTab::Profile,
        ]
    }
}

// =============================================================================
// Navigation Stack
// =============================================================================

/// A navigation stack entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    /// The route
    pub route: Route,
    /// Unique key for this entry
    pub key: String,
}

impl StackEntry {
    /// Create a new stack entry
    pub fn new(route: Route) -> Self {
        Self { route, key: uuid::Uuid::new_v4().to_string() }
    }
}

/// Navigation stack for a tab; never empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationStack {
    /// Entries above the root (bottom to top)
    entries: Vec<StackEntry>,
    /// Root entry
    root: StackEntry,
}

impl NavigationStack {
    /// Create a new navigation stack with a root route
    pub fn new(root: Route) -> Self {
        Self { entries: Vec::new(), root: StackEntry::new(root) }
    }

    /// Push a route onto the stack
    pub fn push(&mut self, route: Route) {
        self.entries.push(StackEntry::new(route));
    }

    /// Pop the top route (returns true if popped, false if at root)
    pub fn pop(&mut self) -> bool {
        self.entries.pop().is_some()
    }

    /// Pop to root
    pub fn pop_to_root(&mut self) {
        self.entries.clear();
    }

    /// Replace the top route
    pub fn replace(&mut self, route: Route) {
        match self.entries.last_mut() {
            Some(last) => *last = StackEntry::new(route),
            None => self.root = StackEntry::new(route),
        }
    }

    /// Get the current (top) entry
    pub fn current_entry(&self) -> &StackEntry {
        self.entries.last().unwrap_or(&self.root)
    }

    /// Get the current (top) route
    pub fn current(&self) -> &Route {
        &self.current_entry().route
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Get stack depth
    pub fn depth(&self) -> usize {
        self.entries.len() + 1
    }
}

// =============================================================================
// Navigation State
// =============================================================================

/// Complete navigation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    /// Current active tab
    pub active_tab: NavigationTab,
    /// Stacks for each tab
    tab_stacks: HashMap<NavigationTab, NavigationStack>,
}

impl Default for NavigationState {
    fn default() -> Self {
        let tab_stacks = NavigationTab::all()
            .into_iter()
            .map(|tab| (tab, NavigationStack::new(tab.root_route())))
            .collect();

        Self { active_tab: NavigationTab::Home, tab_stacks }
    }
}

impl NavigationState {
    /// Create a new navigation state
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack of a tab
    pub fn stack(&self, tab: NavigationTab) -> Option<&NavigationStack> {
        self.tab_stacks.get(&tab)
    }

    fn active_stack_mut(&mut self) -> &mut NavigationStack {
        let tab = self.active_tab;
        self.tab_stacks.entry(tab).or_insert_with(|| NavigationStack::new(tab.root_route()))
    }

    /// Get the current route
    pub fn current_route(&self) -> Route {
        self.stack(self.active_tab)
            .map(|s| s.current().clone())
            .unwrap_or_else(|| self.active_tab.root_route())
    }

    /// Navigate to a route
    ///
    /// A tab root switches to its tab; anything else is pushed onto the
    /// active tab's stack.
    pub fn navigate(&mut self, route: Route) {
        match NavigationTab::for_route(&route) {
            Some(tab) => self.switch_tab(tab),
            None => self.active_stack_mut().push(route),
        }
    }

    /// Replace the current route, e.g. for a guard redirect
    pub fn replace(&mut self, route: Route) {
        match NavigationTab::for_route(&route) {
            Some(tab) => self.reset_to_tab(tab),
            None => self.active_stack_mut().replace(route),
        }
    }

    /// Go back
    pub fn go_back(&mut self) -> bool {
        self.active_stack_mut().pop()
    }

    /// Switch to a tab, keeping its stack
    pub fn switch_tab(&mut self, tab: NavigationTab) {
        self.active_tab = tab;
    }

    /// Switch to a tab and pop it to its root
    pub fn reset_to_tab(&mut self, tab: NavigationTab) {
        self.active_tab = tab;
        self.active_stack_mut().pop_to_root();
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        self.stack(self.active_tab).is_some_and(NavigationStack::can_go_back)
    }

    /// Reset entire navigation state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// Router
// =============================================================================

/// Parameters captured from a path
pub type RouteParams = HashMap<String, String>;

/// Segment type in a pattern
#[derive(Debug, Clone)]
enum PatternSegment {
    /// Literal segment
    Literal(String),
    /// Parameter segment
    Param(String),
}

/// Route pattern for matching
struct RoutePattern {
    /// Pattern segments
    segments: Vec<PatternSegment>,
    /// Route builder
    builder: fn(RouteParams) -> Option<Route>,
}

/// URL Router for parsing paths to routes
pub struct Router {
    /// Route patterns
    patterns: Vec<RoutePattern>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("patterns", &self.patterns.len()).finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a new router with all routes
    pub fn new() -> Self {
        let mut router = Self { patterns: Vec::new() };

        router.add_route("/sign-in", |_| Some(Route::SignIn));
        router.add_route("/", |_| Some(Route::Home));
        router.add_route("/agenda", |_| Some(Route::Agenda));
        router.add_route("/workshops", |_| Some(Route::Workshops));
        router.add_route("/qrcode", |_| Some(Route::Badge));
        router.add_route("/profile", |_| Some(Route::Profile));
        router.add_route("/workshop/:id", |params| {
            Some(Route::WorkshopDetails { id: params.get("id")?.clone() })
        });
        router.add_route("/sponsor/:id", |params| {
            Some(Route::SponsorDetails { slug: params.get("id")?.clone() })
        });

        router
    }

    /// Add a route pattern
    fn add_route(&mut self, pattern: &str, builder: fn(RouteParams) -> Option<Route>) {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => PatternSegment::Param(name.to_string()),
                None => PatternSegment::Literal(s.to_string()),
            })
            .collect();

        self.patterns.push(RoutePattern { segments, builder });
    }

    /// Match a path to a route
    ///
    /// Query strings and fragments are ignored. Unknown paths yield
    /// [`Route::NotFound`].
    pub fn match_path(&self, path: &str) -> Route {
        let pathname = path.split(['?', '#']).next().unwrap_or_default();
        let path_segments: Vec<&str> = pathname.split('/').filter(|s| !s.is_empty()).collect();

        for pattern in &self.patterns {
            if let Some(params) = Self::match_pattern(&pattern.segments, &path_segments) {
                if let Some(route) = (pattern.builder)(params) {
                    return route;
                }
            }
        }

        Route::NotFound
    }

    /// Match a pattern against path segments
    fn match_pattern(pattern: &[PatternSegment], path: &[&str]) -> Option<RouteParams> {
        if pattern.len() != path.len() {
            return None;
        }

        let mut params = RouteParams::new();

        for (segment, actual) in pattern.iter().zip(path.iter()) {
            match segment {
                PatternSegment::Literal(expected) => {
                    if expected != actual {
                        return None;
                    }
                }
                PatternSegment::Param(name) => {
                    let value = urlencoding::decode(actual).ok()?.into_owned();
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), value);
                }
            }
        }

        Some(params)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use conference_client::SessionToken;

    fn signed_in() -> AuthState {
        AuthState { token: Some(SessionToken::new("t")), is_loading: false, error: None }
    }

    fn signed_out() -> AuthState {
        AuthState { token: None, is_loading: false, error: None }
    }

    // =========================================================================
    // Router Tests
    // =========================================================================

    #[test]
    fn test_default_route_is_home() {
        assert_eq!(Route::default(), Route::Home);
        assert_eq!(Route::default().to_path(), "/");
    }

    #[test]
    fn test_match_tab_paths() {
        let router = Router::new();
        assert_eq!(router.match_path("/"), Route::Home);
        assert_eq!(router.match_path(""), Route::Home);
        assert_eq!(router.match_path("/sign-in"), Route::SignIn);
        assert_eq!(router.match_path("/agenda"), Route::Agenda);
        assert_eq!(router.match_path("/workshops/"), Route::Workshops);
        assert_eq!(router.match_path("/qrcode"), Route::Badge);
        assert_eq!(router.match_path("/profile?tab=cv"), Route::Profile);
    }

    #[test]
    fn test_match_param_paths() {
        let router = Router::new();
        assert_eq!(
            router.match_path("/workshop/12"),
            Route::WorkshopDetails { id: "12".to_string() }
        );
        assert_eq!(
            router.match_path("/sponsor/aegean%20grid"),
            Route::SponsorDetails { slug: "aegean grid".to_string() }
        );
    }

    #[test]
    fn test_unknown_paths() {
        let router = Router::new();
        assert_eq!(router.match_path("/workshop"), Route::NotFound);
        assert_eq!(router.match_path("/workshop/1/extra"), Route::NotFound);
        assert_eq!(router.match_path("/settings"), Route::NotFound);
    }

    #[test]
    fn test_route_to_path_round_trip() {
        let router = Router::new();
        let routes = [
            Route::SignIn,
            Route::Home,
            Route::Agenda,
            Route::Workshops,
            Route::Badge,
            Route::Profile,
            Route::WorkshopDetails { id: "7".to_string() },
            Route::SponsorDetails { slug: "kastro-labs".to_string() },
        ];
        for route in routes {
            assert_eq!(router.match_path(&route.to_path()), route);
        }
    }

    // =========================================================================
    // Guard Tests
    // =========================================================================

    #[test]
    fn test_guard_waits_while_loading() {
        let loading = AuthState::loading();
        assert_eq!(guard(&loading, &Route::Profile), GuardDecision::Stay);
        assert_eq!(guard(&loading, &Route::SignIn), GuardDecision::Stay);
    }

    #[test]
    fn test_guard_signed_out_goes_to_sign_in() {
        let auth = signed_out();
        assert_eq!(guard(&auth, &Route::Home), GuardDecision::Redirect(Route::SignIn));
        assert_eq!(
            guard(&auth, &Route::WorkshopDetails { id: "1".to_string() }),
            GuardDecision::Redirect(Route::SignIn)
        );
        assert_eq!(guard(&auth, &Route::SignIn), GuardDecision::Stay);
    }

    #[test]
    fn test_guard_signed_in_leaves_sign_in() {
        let auth = signed_in();
        assert_eq!(guard(&auth, &Route::SignIn), GuardDecision::Redirect(Route::Home));
        assert_eq!(guard(&auth, &Route::NotFound), GuardDecision::Redirect(Route::Home));
        assert_eq!(guard(&auth, &Route::Agenda), GuardDecision::Stay);
        assert_eq!(
            guard(&auth, &Route::WorkshopDetails { id: "1".to_string() }),
            GuardDecision::Stay
        );
    }

    // =========================================================================
    // Navigation State Tests
    // =========================================================================

    #[test]
    fn test_stack_push_pop() {
        let mut stack = NavigationStack::new(Route::Workshops);
        assert!(!stack.can_go_back());
        assert!(!stack.pop());

        stack.push(Route::WorkshopDetails { id: "1".to_string() });
        assert_eq!(stack.depth(), 2);
        assert!(stack.pop());
        assert_eq!(stack.current(), &Route::Workshops);
    }

    #[test]
    fn test_stack_entries_have_unique_keys() {
        let mut stack = NavigationStack::new(Route::Home);
        stack.push(Route::Home);
        assert_ne!(stack.current_entry().key, stack.root.key);
    }

    #[test]
    fn test_navigate_within_tab() {
        let mut nav = NavigationState::new();
        nav.navigate(Route::Workshops);
        assert_eq!(nav.active_tab, NavigationTab::Workshops);

        nav.navigate(Route::WorkshopDetails { id: "3".to_string() });
        assert!(nav.can_go_back());
        assert_eq!(nav.current_route(), Route::WorkshopDetails { id: "3".to_string() });

        assert!(nav.go_back());
        assert_eq!(nav.current_route(), Route::Workshops);
        assert!(!nav.go_back());
    }

    #[test]
    fn test_tab_stacks_are_independent() {
        let mut nav = NavigationState::new();
        nav.navigate(Route::SponsorDetails { slug: "a".to_string() });

        nav.switch_tab(NavigationTab::Agenda);
        assert_eq!(nav.current_route(), Route::Agenda);

        nav.switch_tab(NavigationTab::Home);
        assert_eq!(nav.current_route(), Route::SponsorDetails { slug: "a".to_string() });

        nav.reset_to_tab(NavigationTab::Home);
        assert_eq!(nav.current_route(), Route::Home);
    }

    #[test]
    fn test_replace_with_guard_redirect() {
        let mut nav = NavigationState::new();
        nav.navigate(Route::Profile);
        nav.navigate(Route::SponsorDetails { slug: "a".to_string() });

        if let GuardDecision::Redirect(target) = guard(&signed_in(), &nav.current_route()) {
            nav.replace(target);
        }
        assert_eq!(nav.active_tab, NavigationTab::Home);
        assert_eq!(nav.current_route(), Route::Home);
    }

    #[test]
    fn test_tab_labels() {
        assert_eq!(NavigationTab::Agenda.label(), "Schedule");
        assert_eq!(NavigationTab::Badge.icon(), "qrcode");
        assert_eq!(NavigationTab::for_route(&Route::Profile), Some(NavigationTab::Profile));
        assert_eq!(NavigationTab::for_route(&Route::SignIn), None);
    }
}
