use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Overview of a site as reported by its agent.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SiteStatus {
    /// Site title.
    pub site_name: Option<String>,
    /// Public URL.
    pub site_url: Option<String>,
    /// Installed core version.
    pub core_version: Option<String>,
    /// PHP runtime version.
    pub php_version: Option<String>,
    /// Version of the management agent.
    pub agent_version: Option<String>,
    /// Whether maintenance mode is enabled.
    pub maintenance_mode: bool,
    /// Name of the active theme.
    pub active_theme: Option<String>,
    /// Number of installed plugins, when reported.
    pub plugin_count: Option<u64>,
    /// Whether the install is a multisite network.
    pub multisite: bool,
}

/// Coarse health rating derived from the score.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthRating {
    /// Score of 80 or more.
    Good,
    /// Score of 50 to 79.
    Recommended,
    /// Score below 50.
    Critical,
}

impl HealthRating {
    /// Rates `score`.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 80 {
            Self::Good
        } else if score >= 50 {
            Self::Recommended
        } else {
            Self::Critical
        }
    }

    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Recommended => "recommended",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of one health check.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Must be fixed.
    Critical,
    /// Should be fixed.
    Recommended,
    /// Passed.
    Good,
}

/// One health check result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HealthIssue {
    /// Short label.
    pub label: String,
    /// Severity.
    pub severity: IssueSeverity,
    /// Longer description, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Site health summary.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SiteHealth {
    /// Score in `0..=100`.
    pub score: u8,
    /// Rating derived from the score.
    pub rating: HealthRating,
    /// Whether the score came from the remote rather than being derived.
    pub score_reported: bool,
    /// Number of critical issues.
    pub critical_count: u64,
    /// Number of recommended improvements.
    pub recommended_count: u64,
    /// Individual checks, when reported.
    pub issues: Vec<HealthIssue>,
}

/// Kind of updatable software.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// The content-management core.
    Core,
    /// A plugin.
    Plugin,
    /// A theme.
    Theme,
}

impl UpdateKind {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Plugin => "plugin",
            Self::Theme => "theme",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an [`UpdateKind`] fails.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown update kind '{0}' (expected core, plugin or theme)")]
pub struct ParseUpdateKindError(String);

impl FromStr for UpdateKind {
    type Err = ParseUpdateKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" => Ok(Self::Core),
            "plugin" | "plugins" => Ok(Self::Plugin),
            "theme" | "themes" => Ok(Self::Theme),
            _ => Err(ParseUpdateKindError(s.to_owned())),
        }
    }
}

/// One pending software update.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PendingUpdate {
    /// What is updated.
    pub kind: UpdateKind,
    /// Plugin file, theme stylesheet or `core`.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Installed version, if known.
    pub current_version: Option<String>,
    /// Version offered by the update.
    pub new_version: Option<String>,
}

/// Pending update counts by kind.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct UpdateCounts {
    /// Sum of the other counts.
    pub total: usize,
    /// Plugin updates.
    pub plugins: usize,
    /// Theme updates.
    pub themes: usize,
    /// Core updates, zero or one.
    pub core: usize,
}

/// Every pending update on a site.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct PendingUpdates {
    /// Core update, if one is offered.
    pub core: Option<PendingUpdate>,
    /// Plugin updates.
    pub plugins: Vec<PendingUpdate>,
    /// Theme updates.
    pub themes: Vec<PendingUpdate>,
    /// Counts derived from the lists above.
    pub counts: UpdateCounts,
}

impl PendingUpdates {
    /// Builds the collection and its counts.
    #[must_use]
    pub fn new(
        core: Option<PendingUpdate>,
        plugins: Vec<PendingUpdate>,
        themes: Vec<PendingUpdate>,
    ) -> Self {
        let core_count = usize::from(core.is_some());
        let counts = UpdateCounts {
            total: plugins.len() + themes.len() + core_count,
            plugins: plugins.len(),
            themes: themes.len(),
            core: core_count,
        };
        Self {
            core,
            plugins,
            themes,
            counts,
        }
    }

    /// Finds the pending update for `identifier` of `kind`.
    ///
    /// Plugin identifiers match by file or by slug.
    #[must_use]
    pub fn find(&self, kind: UpdateKind, identifier: &str) -> Option<&PendingUpdate> {
        match kind {
            UpdateKind::Core => self.core.as_ref(),
            UpdateKind::Plugin => self
                .plugins
                .iter()
                .find(|update| plugin_matches(&update.identifier, None, identifier)),
            UpdateKind::Theme => self
                .themes
                .iter()
                .find(|update| update.identifier == identifier),
        }
    }

    /// Reports whether nothing is pending.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.counts.total == 0
    }
}

/// An installed plugin.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InstalledPlugin {
    /// Plugin file relative to the plugins directory, e.g. `akismet/akismet.php`.
    pub file: String,
    /// Directory slug, e.g. `akismet`.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Installed version.
    pub version: Option<String>,
    /// Whether the plugin is active.
    pub active: bool,
    /// Version offered by a pending update.
    pub update_version: Option<String>,
    /// Author, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl InstalledPlugin {
    /// Reports whether `identifier` names this plugin, by file or slug.
    #[must_use]
    pub fn matches(&self, identifier: &str) -> bool {
        plugin_matches(&self.file, Some(&self.slug), identifier)
    }
}

fn plugin_matches(file: &str, slug: Option<&str>, identifier: &str) -> bool {
    let identifier = identifier.trim_matches('/');
    file == identifier
        || slug == Some(identifier)
        || file
            .strip_prefix(identifier)
            .is_some_and(|rest| rest.starts_with('/'))
        || file.strip_suffix(".php") == Some(identifier)
}

/// An installed theme.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InstalledTheme {
    /// Stylesheet directory name.
    pub stylesheet: String,
    /// Display name.
    pub name: String,
    /// Installed version.
    pub version: Option<String>,
    /// Whether the theme is active.
    pub active: bool,
    /// Version offered by a pending update.
    pub update_version: Option<String>,
    /// Parent theme stylesheet for child themes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// A user account.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SiteUser {
    /// Numeric id.
    pub id: u64,
    /// Login name.
    pub login: String,
    /// E-mail address.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Assigned roles.
    pub roles: Vec<String>,
    /// Registration timestamp as reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<String>,
}

/// Moderation status of a comment.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    /// Published.
    Approved,
    /// Awaiting moderation.
    Pending,
    /// Marked as spam.
    Spam,
    /// In the trash.
    Trash,
}

impl CommentStatus {
    /// Returns the value sent in the `status` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::Spam => "spam",
            Self::Trash => "trash",
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`CommentStatus`] or [`CommentBucket`] fails.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown comment status '{0}'")]
pub struct ParseCommentStatusError(String);

impl FromStr for CommentStatus {
    type Err = ParseCommentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" | "1" => Ok(Self::Approved),
            "pending" | "hold" | "unapproved" | "moderated" | "0" => Ok(Self::Pending),
            "spam" => Ok(Self::Spam),
            "trash" | "trashed" => Ok(Self::Trash),
            _ => Err(ParseCommentStatusError(s.to_owned())),
        }
    }
}

/// Comment bucket that can be purged as a whole.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentBucket {
    /// Spam comments.
    Spam,
    /// Trashed comments.
    Trash,
}

impl CommentBucket {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Trash => "trash",
        }
    }
}

impl fmt::Display for CommentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentBucket {
    type Err = ParseCommentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<CommentStatus>()? {
            CommentStatus::Spam => Ok(Self::Spam),
            CommentStatus::Trash => Ok(Self::Trash),
            CommentStatus::Approved | CommentStatus::Pending => {
                Err(ParseCommentStatusError(s.to_owned()))
            }
        }
    }
}

/// Comment totals per status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CommentCounts {
    /// All comments.
    pub total: u64,
    /// Published comments.
    pub approved: u64,
    /// Comments awaiting moderation.
    pub pending: u64,
    /// Spam comments.
    pub spam: u64,
    /// Trashed comments.
    pub trash: u64,
}

impl CommentCounts {
    /// Returns the count for `bucket`.
    #[must_use]
    pub const fn bucket(&self, bucket: CommentBucket) -> u64 {
        match bucket {
            CommentBucket::Spam => self.spam,
            CommentBucket::Trash => self.trash,
        }
    }
}

/// One comment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Comment {
    /// Numeric id.
    pub id: u64,
    /// Post the comment belongs to.
    pub post_id: Option<u64>,
    /// Author name.
    pub author: Option<String>,
    /// Comment text, possibly truncated by the agent.
    pub content: Option<String>,
    /// Moderation status, when recognised.
    pub status: Option<CommentStatus>,
    /// Timestamp as reported.
    pub date: Option<String>,
}

/// Counts and, when requested, individual comments.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CommentSummary {
    /// Totals per status.
    pub counts: CommentCounts,
    /// Comments returned by the query.
    pub comments: Vec<Comment>,
}

/// Parameters of [`SiteClient::get_comments`](crate::SiteClient::get_comments).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CommentFilter {
    status: Option<CommentStatus>,
    limit: Option<u32>,
}

impl CommentFilter {
    /// Filter matching every comment.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: None,
            limit: None,
        }
    }

    /// Restricts the query to `status`.
    #[must_use]
    pub const fn with_status(mut self, status: CommentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Caps the number of comments returned.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the status restriction.
    #[must_use]
    pub const fn status(&self) -> Option<CommentStatus> {
        self.status
    }

    /// Returns the limit.
    #[must_use]
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status".to_owned(), status.as_str().to_owned()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_owned(), limit.to_string()));
        }
        pairs
    }
}
