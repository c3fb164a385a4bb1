//! Route groups and the mount table.
//!
//! Every route group is registered once, then mounted under each alias
//! prefix (`""` for the canonical paths, `/api` for the ingress). Resolution
//! picks the longest mounted prefix that covers the request path, strips it
//! and looks the remainder up in the group's bindings.
//!
//! Matching follows the usual router conventions: prefixes match on whole
//! path segments, comparisons ignore ASCII case and a trailing `/` is
//! insignificant.

use axum::http::Method;
use std::sync::Arc;

/// Prefix the ingress forwards requests under.
pub const API_PREFIX: &str = "/api";

/// Aliases every route group is mounted under, in mount order.
pub const MOUNT_ALIASES: [&str; 2] = ["", API_PREFIX];

/// Controller operation a binding invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Health,
    RegisterClient,
    LoginClient,
    /// Hand the request unchanged to the backend.
    Relay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Only(Method),
    Any,
}

impl MethodFilter {
    /// `GET` bindings also answer `HEAD`.
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(expected) => {
                expected == method || (*expected == Method::GET && *method == Method::HEAD)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subpath {
    Exact(String),
    Any,
}

impl Subpath {
    pub fn exact(path: &str) -> Self {
        Subpath::Exact(normalize(path).to_string())
    }

    pub fn matches(&self, remainder: &str) -> bool {
        match self {
            Subpath::Any => true,
            Subpath::Exact(expected) => normalize(remainder).eq_ignore_ascii_case(expected),
        }
    }
}

fn normalize(path: &str) -> &str {
    path.trim_end_matches('/')
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub method: MethodFilter,
    pub subpath: Subpath,
    pub action: Action,
}

/// Bindings for one business area, registered under a canonical prefix.
#[derive(Debug, Clone)]
pub struct RouteGroup {
    pub name: &'static str,
    /// Canonical prefix; the empty string is the root.
    pub prefix: String,
    pub bindings: Vec<Binding>,
}

impl RouteGroup {
    pub fn new(name: &'static str, prefix: &str) -> Self {
        Self {
            name,
            prefix: normalize(prefix).to_string(),
            bindings: Vec::new(),
        }
    }

    pub fn get(self, subpath: &str, action: Action) -> Self {
        self.bind(MethodFilter::Only(Method::GET), Subpath::exact(subpath), action)
    }

    pub fn post(self, subpath: &str, action: Action) -> Self {
        self.bind(MethodFilter::Only(Method::POST), Subpath::exact(subpath), action)
    }

    /// Catch-all binding for any method and any subpath.
    pub fn any(self, action: Action) -> Self {
        self.bind(MethodFilter::Any, Subpath::Any, action)
    }

    pub fn bind(mut self, method: MethodFilter, subpath: Subpath, action: Action) -> Self {
        self.bindings.push(Binding {
            method,
            subpath,
            action,
        });
        self
    }

    /// First binding, in registration order, accepting the method and remainder.
    pub fn find(&self, method: &Method, remainder: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.method.matches(method) && b.subpath.matches(remainder))
    }
}

/// A route group mounted at a concrete prefix.
#[derive(Debug, Clone)]
pub struct Mount {
    pub prefix: String,
    pub group: Arc<RouteGroup>,
}

impl Mount {
    /// Remainder of `path` after this mount's prefix, if the prefix covers it.
    fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefix.is_empty() {
            return Some(path);
        }

        let head = path.get(..self.prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }

        let rest = &path[self.prefix.len()..];
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Prefix as it appears in a URL.
    pub fn display_prefix(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }
}

/// Result of resolving a request against the mount table.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub mount: &'a Mount,
    pub remainder: &'a str,
    pub action: Action,
}

impl RouteMatch<'_> {
    pub fn group(&self) -> &RouteGroup {
        &self.mount.group
    }
}

#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: Vec<Mount>,
}

impl MountTable {
    /// Mount every group under every alias: all groups for the first alias,
    /// then all groups again for the next, preserving relative order.
    pub fn build(groups: Vec<RouteGroup>, aliases: &[&str]) -> Self {
        let groups: Vec<Arc<RouteGroup>> = groups.into_iter().map(Arc::new).collect();

        let mounts = aliases
            .iter()
            .flat_map(|alias| {
                let alias = normalize(alias);
                groups.iter().map(move |group| Mount {
                    prefix: format!("{}{}", alias, group.prefix),
                    group: Arc::clone(group),
                })
            })
            .collect();

        Self { mounts }
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Resolve a request to the binding it should run.
    ///
    /// Only the longest covering prefix is consulted; a binding miss there
    /// is final even if a shorter prefix would also cover the path.
    pub fn resolve<'a>(&'a self, method: &Method, path: &'a str) -> Option<RouteMatch<'a>> {
        let mut best: Option<(&Mount, &str)> = None;

        for mount in &self.mounts {
            if let Some(rest) = mount.strip(path) {
                if best.map_or(true, |(b, _)| mount.prefix.len() > b.prefix.len()) {
                    best = Some((mount, rest));
                }
            }
        }

        let (mount, remainder) = best?;
        let binding = mount.group.find(method, remainder)?;

        Some(RouteMatch {
            mount,
            remainder,
            action: binding.action,
        })
    }
}

/// The gateway's route groups in mount order.
pub fn route_groups() -> Vec<RouteGroup> {
    vec![
        RouteGroup::new("health", "").get("", Action::Health),
        RouteGroup::new("client", "/client")
            .post("/register", Action::RegisterClient)
            .get("", Action::LoginClient),
        RouteGroup::new("client-preferences", "/client-preferences").any(Action::Relay),
        RouteGroup::new("portfolio", "/portfolio").any(Action::Relay),
        RouteGroup::new("trade", "/trade").any(Action::Relay),
        RouteGroup::new("activity-report", "/activity-report").any(Action::Relay),
    ]
}

pub fn gateway_mount_table() -> MountTable {
    MountTable::build(route_groups(), &MOUNT_ALIASES)
}
