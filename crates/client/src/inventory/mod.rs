//! Read-only inventory queries.
//!
//! Each query negotiates the route, then normalises the payload into one of
//! the stable types in this module. Queries carry no verification logic and
//! may be retried freely.

mod normalize;
mod types;

#[cfg(test)]
mod tests;

use serde_json::Value;
use wire::{Operation, OperationRequest};

use crate::client::SiteClient;
use crate::error::{ClientError, ErrorKind};

pub use self::types::{
    Comment, CommentBucket, CommentCounts, CommentFilter, CommentStatus, CommentSummary,
    HealthIssue, HealthRating, InstalledPlugin, InstalledTheme, IssueSeverity,
    ParseCommentStatusError, ParseUpdateKindError, PendingUpdate, PendingUpdates, SiteHealth,
    SiteStatus, SiteUser, UpdateCounts, UpdateKind,
};

impl SiteClient {
    fn read<T>(
        &self,
        request: OperationRequest,
        normalize: fn(&Value) -> Result<T, String>,
    ) -> Result<T, ClientError> {
        let operation = request.operation();
        let payload = self.query(request)?;
        let value = normalize(&payload).map_err(|detail| {
            ClientError::new(ErrorKind::MalformedRemoteResponse, detail).with_operation(operation)
        })?;
        logging::trace_inventory!(operation = operation.name(), "payload normalised");
        Ok(value)
    }

    /// Returns the site overview.
    pub fn get_status(&self) -> Result<SiteStatus, ClientError> {
        self.read(
            OperationRequest::new(Operation::GetStatus),
            normalize::site_status,
        )
    }

    /// Returns the health score and issues.
    pub fn get_health(&self) -> Result<SiteHealth, ClientError> {
        self.read(
            OperationRequest::new(Operation::GetHealth),
            normalize::site_health,
        )
    }

    /// Returns every pending update with counts by kind.
    pub fn get_updates(&self) -> Result<PendingUpdates, ClientError> {
        self.read(
            OperationRequest::new(Operation::GetUpdates),
            normalize::pending_updates,
        )
    }

    /// Returns the installed plugins.
    pub fn get_plugins(&self) -> Result<Vec<InstalledPlugin>, ClientError> {
        self.read(OperationRequest::new(Operation::GetPlugins), normalize::plugins)
    }

    /// Returns the installed themes.
    pub fn get_themes(&self) -> Result<Vec<InstalledTheme>, ClientError> {
        self.read(OperationRequest::new(Operation::GetThemes), normalize::themes)
    }

    /// Returns the user accounts.
    pub fn get_users(&self) -> Result<Vec<SiteUser>, ClientError> {
        self.read(OperationRequest::new(Operation::GetUsers), normalize::users)
    }

    /// Returns comment counts and the comments matching `filter`.
    pub fn get_comments(&self, filter: &CommentFilter) -> Result<CommentSummary, ClientError> {
        let request = filter
            .query_pairs()
            .into_iter()
            .fold(OperationRequest::new(Operation::GetComments), |request, (key, value)| {
                request.with_query(key, value)
            });
        self.read(request, normalize::comments)
    }
}
