use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

/// HTTP method used by an operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method token as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which configured timeout governs an operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutClass {
    /// Inventory reads and quick mutations.
    Read,
    /// Single software updates, which install code on the remote side.
    Update,
    /// Bulk updates covering several items in one call.
    Bulk,
}

macro_rules! operations {
    ($(
        $(#[$doc:meta])*
        $variant:ident => $name:literal, $method:ident, $current:literal, $legacy:literal, $class:ident;
    )*) => {
        /// Logical call understood by the management agent.
        ///
        /// Each operation carries its own routing: the HTTP method, the path
        /// below each agent namespace and the timeout class. Parameters are
        /// identical across namespaces, so a request can be replayed against
        /// the legacy generation unchanged.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum Operation {
            $($(#[$doc])* $variant,)*
        }

        impl Operation {
            /// Every operation, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Returns the kebab-case name used in logs and error reports.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self { $(Self::$variant => $name,)* }
            }

            /// Returns the HTTP method.
            #[must_use]
            pub const fn method(self) -> Method {
                match self { $(Self::$variant => Method::$method,)* }
            }

            /// Returns the path below the current namespace.
            #[must_use]
            pub const fn current_path(self) -> &'static str {
                match self { $(Self::$variant => $current,)* }
            }

            /// Returns the path below the legacy namespace.
            #[must_use]
            pub const fn legacy_path(self) -> &'static str {
                match self { $(Self::$variant => $legacy,)* }
            }

            /// Returns the timeout class.
            #[must_use]
            pub const fn timeout_class(self) -> TimeoutClass {
                match self { $(Self::$variant => TimeoutClass::$class,)* }
            }
        }
    };
}

operations! {
    /// Site status: software versions, maintenance flag, basic facts.
    GetStatus => "get-status", Get, "status", "site-status", Read;
    /// Health score and reported issues.
    GetHealth => "get-health", Get, "health", "site-health", Read;
    /// Pending core, plugin and theme updates.
    GetUpdates => "get-updates", Get, "updates", "get-updates", Read;
    /// Installed plugins.
    GetPlugins => "get-plugins", Get, "plugins", "get-plugins", Read;
    /// Installed themes.
    GetThemes => "get-themes", Get, "themes", "get-themes", Read;
    /// User accounts.
    GetUsers => "get-users", Get, "users", "get-users", Read;
    /// Comment counts and optionally a page of comments.
    GetComments => "get-comments", Get, "comments", "get-comments", Read;
    /// Apply a pending plugin update.
    UpdatePlugin => "update-plugin", Post, "plugins/update", "update-plugin", Update;
    /// Apply a pending theme update.
    UpdateTheme => "update-theme", Post, "themes/update", "update-theme", Update;
    /// Apply a pending core update.
    UpdateCore => "update-core", Post, "core/update", "update-core", Update;
    /// Activate an installed plugin.
    ActivatePlugin => "activate-plugin", Post, "plugins/activate", "activate-plugin", Read;
    /// Deactivate an installed plugin.
    DeactivatePlugin => "deactivate-plugin", Post, "plugins/deactivate", "deactivate-plugin", Read;
    /// Install a plugin from the public directory.
    InstallPlugin => "install-plugin", Post, "plugins/install", "install-plugin", Update;
    /// Switch maintenance mode on or off.
    ToggleMaintenance => "toggle-maintenance", Post, "maintenance", "maintenance-mode", Read;
    /// Delete specific comments.
    DeleteComments => "delete-comments", Post, "comments/delete", "delete-comments", Read;
    /// Purge the spam or trash bucket.
    CleanComments => "clean-comments", Post, "comments/clean", "clean-comments", Read;
    /// Apply several updates in one call.
    BulkUpdate => "bulk-update", Post, "updates/bulk", "bulk-update", Bulk;
}

impl Operation {
    /// Reports whether the operation changes remote state.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self.method(), Method::Get)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One logical call with its parameters.
///
/// The request is namespace-agnostic; the negotiator decides where it is sent.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationRequest {
    operation: Operation,
    query: Vec<(String, String)>,
    body: Option<Value>,
    timeout: Option<Duration>,
}

impl OperationRequest {
    /// Creates a request without parameters.
    #[must_use]
    pub const fn new(operation: Operation) -> Self {
        Self {
            operation,
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Overrides the timeout implied by the operation's [`TimeoutClass`].
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the logical operation.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the query parameters in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the JSON body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Returns the explicit timeout override, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn routes_are_unique_per_namespace() {
        let current: HashSet<_> = Operation::ALL.iter().map(|op| op.current_path()).collect();
        let legacy: HashSet<_> = Operation::ALL.iter().map(|op| op.legacy_path()).collect();
        assert_eq!(current.len(), Operation::ALL.len());
        assert_eq!(legacy.len(), Operation::ALL.len());
    }

    #[test]
    fn reads_use_get_and_mutations_do_not() {
        assert!(!Operation::GetStatus.is_mutation());
        assert!(!Operation::GetComments.is_mutation());
        assert!(Operation::UpdatePlugin.is_mutation());
        assert!(Operation::ToggleMaintenance.is_mutation());
        assert_eq!(Operation::DeleteComments.method(), Method::Post);
    }

    #[test]
    fn slow_operations_get_extended_timeouts() {
        assert_eq!(Operation::UpdateCore.timeout_class(), TimeoutClass::Update);
        assert_eq!(Operation::UpdateTheme.timeout_class(), TimeoutClass::Update);
        assert_eq!(Operation::BulkUpdate.timeout_class(), TimeoutClass::Bulk);
        assert_eq!(Operation::GetPlugins.timeout_class(), TimeoutClass::Read);
    }

    #[test]
    fn request_builder_keeps_parameters() {
        let request = OperationRequest::new(Operation::GetComments)
            .with_query("status", "spam")
            .with_query("per_page", "5")
            .with_timeout(Duration::from_secs(2));

        assert_eq!(request.operation(), Operation::GetComments);
        assert_eq!(request.query()[1], ("per_page".to_owned(), "5".to_owned()));
        assert_eq!(request.timeout(), Some(Duration::from_secs(2)));
        assert!(request.body().is_none());
    }

    #[test]
    fn names_are_kebab_case() {
        assert_eq!(Operation::GetStatus.to_string(), "get-status");
        assert_eq!(
            serde_json::to_value(Operation::UpdatePlugin).unwrap(),
            serde_json::json!("update-plugin")
        );
    }
}
