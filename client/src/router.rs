//! View router.
//!
//! Pages and dashboard tabs form explicit mutual-exclusion groups: activating
//! a member deactivates all its siblings. Exactly one page is visible, and a
//! dashboard page shows exactly one of its own tabs.

use crate::types::Role;
use std::fmt;

/// A closed set of members of which exactly one is active
pub trait GroupMember: Copy + Eq + fmt::Debug + 'static {
    /// Every member of the group
    const ALL: &'static [Self];
}

/// Mutual-exclusion group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusiveGroup<T: GroupMember> {
    active: T,
}

impl<T: GroupMember> ExclusiveGroup<T> {
    /// Create a group with `initial` active
    #[must_use]
    pub const fn new(initial: T) -> Self {
        Self { active: initial }
    }

    /// Activate `member`; returns the siblings that were deactivated
    pub fn activate(&mut self, member: T) -> Vec<T> {
        let deactivated = if self.active == member {
            Vec::new()
        } else {
            vec![self.active]
        };
        self.active = member;
        deactivated
    }

    /// The active member
    #[must_use]
    pub const fn active(&self) -> T {
        self.active
    }

    /// Whether `member` is active
    #[must_use]
    pub fn is_active(&self, member: T) -> bool {
        self.active == member
    }

    /// Members currently active; always exactly one
    pub fn active_members(&self) -> impl Iterator<Item = T> + '_ {
        T::ALL.iter().copied().filter(|m| self.is_active(*m))
    }
}

/// Top-level pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// Sign-in page
    Login,
    /// Account creation page
    Signup,
    /// Customer dashboard
    CustomerDashboard,
    /// Administrator dashboard
    AdminDashboard,
}

impl GroupMember for Page {
    const ALL: &'static [Self] = &[
        Self::Login,
        Self::Signup,
        Self::CustomerDashboard,
        Self::AdminDashboard,
    ];
}

/// Customer dashboard tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CustomerTab {
    /// Browse events
    #[default]
    Events,
    /// My bookings
    Bookings,
    /// Favorite events
    Favorites,
}

impl GroupMember for CustomerTab {
    const ALL: &'static [Self] = &[Self::Events, Self::Bookings, Self::Favorites];
}

/// Administrator dashboard tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AdminTab {
    /// All events with booking counts
    #[default]
    Events,
    /// Create-event form
    CreateEvent,
    /// Edit/delete list
    ManageEvents,
    /// Totals and fill rate
    Analytics,
}

impl GroupMember for AdminTab {
    const ALL: &'static [Self] = &[
        Self::Events,
        Self::CreateEvent,
        Self::ManageEvents,
        Self::Analytics,
    ];
}

/// A navigation target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in page
    Login,
    /// Account creation page
    Signup,
    /// A customer dashboard tab
    Customer(CustomerTab),
    /// An administrator dashboard tab
    Admin(AdminTab),
}

impl Route {
    /// Default route of a role's dashboard
    #[must_use]
    pub const fn dashboard(role: Role) -> Self {
        match role {
            Role::Customer => Self::Customer(CustomerTab::Events),
            Role::Admin => Self::Admin(AdminTab::Events),
        }
    }

    /// Role a route requires, if any
    #[must_use]
    pub const fn required_role(self) -> Option<Role> {
        match self {
            Self::Login | Self::Signup => None,
            Self::Customer(_) => Some(Role::Customer),
            Self::Admin(_) => Some(Role::Admin),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Signup => write!(f, "signup"),
            Self::Customer(tab) => write!(f, "customerDashboard/{tab:?}"),
            Self::Admin(tab) => write!(f, "adminDashboard/{tab:?}"),
        }
    }
}

/// A visible view: a page, or a dashboard tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// A page
    Page(Page),
    /// A customer tab
    CustomerTab(CustomerTab),
    /// An admin tab
    AdminTab(AdminTab),
}

/// Navigation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRefused {
    /// Requested route
    pub route: Route,
    /// Role of the active identity, if any
    pub role: Option<Role>,
}

impl fmt::Display for RouteRefused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Some(role) => write!(f, "{} is not available to {role} users", self.route),
            None => write!(f, "{} requires signing in", self.route),
        }
    }
}

/// Page and tab state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRouter {
    pages: ExclusiveGroup<Page>,
    customer_tabs: ExclusiveGroup<CustomerTab>,
    admin_tabs: ExclusiveGroup<AdminTab>,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self {
            pages: ExclusiveGroup::new(Page::Login),
            customer_tabs: ExclusiveGroup::new(CustomerTab::default()),
            admin_tabs: ExclusiveGroup::new(AdminTab::default()),
        }
    }
}

impl ViewRouter {
    /// Navigate to `route` on behalf of a user with role `role`
    ///
    /// # Errors
    ///
    /// Returns [`RouteRefused`] when a dashboard route does not match the role
    /// (or nobody is signed in). The router is unchanged in that case.
    pub fn navigate(&mut self, route: Route, role: Option<Role>) -> Result<(), RouteRefused> {
        if let Some(required) = route.required_role() {
            if role != Some(required) {
                return Err(RouteRefused { route, role });
            }
        }

        match route {
            Route::Login => {
                self.pages.activate(Page::Login);
            },
            Route::Signup => {
                self.pages.activate(Page::Signup);
            },
            Route::Customer(tab) => {
                self.pages.activate(Page::CustomerDashboard);
                self.customer_tabs.activate(tab);
            },
            Route::Admin(tab) => {
                self.pages.activate(Page::AdminDashboard);
                self.admin_tabs.activate(tab);
            },
        }
        Ok(())
    }

    /// The visible page
    #[must_use]
    pub const fn page(&self) -> Page {
        self.pages.active()
    }

    /// The current route
    #[must_use]
    pub const fn current(&self) -> Route {
        match self.pages.active() {
            Page::Login => Route::Login,
            Page::Signup => Route::Signup,
            Page::CustomerDashboard => Route::Customer(self.customer_tabs.active()),
            Page::AdminDashboard => Route::Admin(self.admin_tabs.active()),
        }
    }

    /// Every visible view: the page, plus its tab on a dashboard
    #[must_use]
    pub fn visible(&self) -> Vec<View> {
        let mut views: Vec<View> = self.pages.active_members().map(View::Page).collect();
        match self.page() {
            Page::CustomerDashboard => {
                views.extend(self.customer_tabs.active_members().map(View::CustomerTab));
            },
            Page::AdminDashboard => {
                views.extend(self.admin_tabs.active_members().map(View::AdminTab));
            },
            Page::Login | Page::Signup => {},
        }
        views
    }
}
