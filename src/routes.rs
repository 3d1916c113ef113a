use std::time::Duration;

use crate::schemas::Role;
use crate::session::Session;

const MANAGEMENT_ROLES: &[Role] = &[Role::Owner, Role::Admin];
const ANY_ROLE: &[Role] = &[Role::Owner, Role::Admin, Role::Tenant];
const TENANT_ROLES: &[Role] = &[Role::Tenant];

/// Client-side pages of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Properties,
    NewProperty,
    Rentals,
    NewRental,
    Tenants,
    Payments,
    Schedules,
    Accounting,
    Documents,
    MyPayments,
    MyDocuments,
}

impl Route {
    pub const ALL: [Route; 13] = [
        Route::Login,
        Route::Dashboard,
        Route::Properties,
        Route::NewProperty,
        Route::Rentals,
        Route::NewRental,
        Route::Tenants,
        Route::Payments,
        Route::Schedules,
        Route::Accounting,
        Route::Documents,
        Route::MyPayments,
        Route::MyDocuments,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
            Self::Properties => "/dashboard/properties",
            Self::NewProperty => "/dashboard/properties/new",
            Self::Rentals => "/dashboard/rentals",
            Self::NewRental => "/dashboard/rentals/new",
            Self::Tenants => "/dashboard/tenants",
            Self::Payments => "/dashboard/payments",
            Self::Schedules => "/dashboard/payments/schedules",
            Self::Accounting => "/dashboard/accounting",
            Self::Documents => "/dashboard/documents",
            Self::MyPayments => "/dashboard/my-payments",
            Self::MyDocuments => "/dashboard/my-documents",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Login => "Sign in",
            Self::Dashboard => "Dashboard",
            Self::Properties => "Properties",
            Self::NewProperty => "New property",
            Self::Rentals => "Rentals",
            Self::NewRental => "New rental",
            Self::Tenants => "Tenants",
            Self::Payments => "Payments",
            Self::Schedules => "Payment schedules",
            Self::Accounting => "Accounting",
            Self::Documents => "Documents",
            Self::MyPayments => "My payments",
            Self::MyDocuments => "My documents",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        Self::ALL.into_iter().find(|route| route.path() == trimmed)
    }

    /// Roles allowed to open the page. `None` means public.
    pub fn allowed_roles(self) -> Option<&'static [Role]> {
        match self {
            Self::Login => None,
            Self::Dashboard => Some(ANY_ROLE),
            Self::MyPayments | Self::MyDocuments => Some(TENANT_ROLES),
            _ => Some(MANAGEMENT_ROLES),
        }
    }

    fn in_navigation(self) -> bool {
        !matches!(self, Self::Login | Self::NewProperty | Self::NewRental)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub to: Route,
    pub after: Duration,
}

impl Redirect {
    pub fn now(to: Route) -> Self {
        Self {
            to,
            after: Duration::ZERO,
        }
    }

    pub fn delayed(to: Route, after: Duration) -> Self {
        Self { to, after }
    }
}

/// Sidebar entries for a role, in display order.
pub fn navigation_for(role: Role) -> Vec<Route> {
    Route::ALL
        .into_iter()
        .filter(|route| route.in_navigation())
        .filter(|route| {
            route
                .allowed_roles()
                .is_some_and(|roles| roles.contains(&role))
        })
        .collect()
}

/// Resolve where a navigation attempt ends up.
pub fn guard(route: Route, session: &Session) -> Result<Route, Redirect> {
    let Some(roles) = route.allowed_roles() else {
        return Ok(route);
    };
    let Some(role) = session.role() else {
        return Err(Redirect::now(Route::Login));
    };
    if roles.contains(&role) {
        Ok(route)
    } else {
        tracing::debug!(route = route.path(), role = role.as_str(), "Route not allowed for role");
        Err(Redirect::now(Route::Dashboard))
    }
}
