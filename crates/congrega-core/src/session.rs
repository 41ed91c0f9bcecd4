//! Session role gate
//!
//! Tracks whether the session is public or signed in as administrator, the
//! active view, and which commands the configured [`AccessPolicy`] allows
//! for each role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, ACCESS_DENIED_NOTICE};
use crate::models::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Public,
    Admin,
}

/// Who may change events and prayer requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// The public may add events and prayer requests; admins edit and delete
    #[default]
    Open,
    /// Every mutation requires an administrator
    Strict,
}

impl FromStr for AccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(AccessPolicy::Open),
            "strict" => Ok(AccessPolicy::Strict),
            other => Err(format!("unknown access policy '{}'", other)),
        }
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPolicy::Open => f.write_str("open"),
            AccessPolicy::Strict => f.write_str("strict"),
        }
    }
}

/// A command subject to the role gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add(EntityKind),
    Update(EntityKind),
    Delete(EntityKind),
    ConvertVisitor,
    Export,
    Import,
    Reset,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Add(kind) => write!(f, "add {}", kind),
            Action::Update(kind) => write!(f, "update {}", kind),
            Action::Delete(kind) => write!(f, "delete {}", kind),
            Action::ConvertVisitor => f.write_str("convert visitor"),
            Action::Export => f.write_str("export backup"),
            Action::Import => f.write_str("import backup"),
            Action::Reset => f.write_str("reset data"),
        }
    }
}

impl AccessPolicy {
    /// Whether `role` may perform `action`
    pub fn allows(self, role: Role, action: Action) -> bool {
        if role == Role::Admin {
            return true;
        }
        match (self, action) {
            (AccessPolicy::Open, Action::Add(EntityKind::Events))
            | (AccessPolicy::Open, Action::Add(EntityKind::PrayerRequests)) => true,
            _ => false,
        }
    }
}

/// Screens of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Dashboard,
    Members,
    Visitors,
    Events,
    Program,
    Prayer,
    Database,
}

impl View {
    pub const ALL: [View; 7] = [
        View::Dashboard,
        View::Members,
        View::Visitors,
        View::Events,
        View::Program,
        View::Prayer,
        View::Database,
    ];

    pub fn requires_admin(self) -> bool {
        matches!(self, View::Members | View::Visitors | View::Database)
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Dashboard => "Painel",
            View::Members => "Membros",
            View::Visitors => "Visitantes",
            View::Events => "Eventos",
            View::Program => "Programação",
            View::Prayer => "Pedidos de Oração",
            View::Database => "Banco de Dados",
        }
    }
}

/// What the view layer should render for the active view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAccess {
    Granted(View),
    /// Admin view requested in the public role
    Denied(View),
}

impl ViewAccess {
    pub fn placeholder(self) -> Option<&'static str> {
        match self {
            ViewAccess::Granted(_) => None,
            ViewAccess::Denied(_) => Some(ACCESS_DENIED_NOTICE),
        }
    }
}

/// Role and active view of one application session
#[derive(Debug, Clone, Default)]
pub struct Session {
    role: Role,
    view: View,
    policy: AccessPolicy,
}

impl Session {
    /// A new session: public, on the dashboard
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            role: Role::Public,
            view: View::Dashboard,
            policy,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Apply a role change
    ///
    /// Returns whether the role actually changed. Every change sends the
    /// session back to the dashboard.
    pub fn set_role(&mut self, role: Role) -> bool {
        if self.role == role {
            return false;
        }
        self.role = role;
        self.view = View::Dashboard;
        true
    }

    pub fn navigate(&mut self, view: View) {
        self.view = view;
    }

    /// The active view, or a denial if it needs a role the session lacks
    pub fn resolve_view(&self) -> ViewAccess {
        if self.view.requires_admin() && !self.is_admin() {
            ViewAccess::Denied(self.view)
        } else {
            ViewAccess::Granted(self.view)
        }
    }

    pub fn can(&self, action: Action) -> bool {
        self.policy.allows(self.role, action)
    }

    pub fn authorize(&self, action: Action) -> Result<(), CommandError> {
        if self.can(action) {
            Ok(())
        } else {
            Err(CommandError::Forbidden {
                action: action.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_public_dashboard() {
        let session = Session::new(AccessPolicy::Open);
        assert_eq!(session.role(), Role::Public);
        assert_eq!(session.view(), View::Dashboard);
    }

    #[test]
    fn test_role_change_resets_view() {
        let mut session = Session::new(AccessPolicy::Open);
        session.navigate(View::Events);

        assert!(session.set_role(Role::Admin));
        assert_eq!(session.view(), View::Dashboard);

        session.navigate(View::Members);
        assert!(!session.set_role(Role::Admin));
        assert_eq!(session.view(), View::Members);

        assert!(session.set_role(Role::Public));
        assert_eq!(session.view(), View::Dashboard);
    }

    #[test]
    fn test_admin_view_denied_in_public() {
        let mut session = Session::new(AccessPolicy::Open);
        session.navigate(View::Database);

        let access = session.resolve_view();
        assert_eq!(access, ViewAccess::Denied(View::Database));
        assert_eq!(access.placeholder(), Some("Acesso restrito à administração."));

        session.navigate(View::Prayer);
        assert_eq!(session.resolve_view(), ViewAccess::Granted(View::Prayer));
    }

    #[test]
    fn test_open_policy() {
        let policy = AccessPolicy::Open;
        assert!(policy.allows(Role::Public, Action::Add(EntityKind::Events)));
        assert!(policy.allows(Role::Public, Action::Add(EntityKind::PrayerRequests)));
        assert!(!policy.allows(Role::Public, Action::Update(EntityKind::Events)));
        assert!(!policy.allows(Role::Public, Action::Delete(EntityKind::PrayerRequests)));
        assert!(!policy.allows(Role::Public, Action::Add(EntityKind::Members)));
        assert!(!policy.allows(Role::Public, Action::Update(EntityKind::Program)));
        assert!(!policy.allows(Role::Public, Action::Export));
        assert!(policy.allows(Role::Admin, Action::Reset));
    }

    #[test]
    fn test_strict_policy() {
        let policy = AccessPolicy::Strict;
        assert!(!policy.allows(Role::Public, Action::Add(EntityKind::Events)));
        assert!(!policy.allows(Role::Public, Action::Add(EntityKind::PrayerRequests)));
        assert!(policy.allows(Role::Admin, Action::Add(EntityKind::PrayerRequests)));
    }

    #[test]
    fn test_authorize_error() {
        let session = Session::new(AccessPolicy::Strict);
        let err = session
            .authorize(Action::Delete(EntityKind::Members))
            .unwrap_err();
        assert!(matches!(err, CommandError::Forbidden { action } if action == "delete member"));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Strict".parse::<AccessPolicy>(), Ok(AccessPolicy::Strict));
        assert!("lenient".parse::<AccessPolicy>().is_err());
    }
}
