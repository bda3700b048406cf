//! Short text summaries for terminal output.

use std::fmt::Write as _;

use client::{
    BatchReport, CommentSummary, CredentialCheck, InstalledPlugin, InstalledTheme, IssueSeverity,
    MutationOutcome, PendingUpdate, PendingUpdates, SiteHealth, SiteStatus, SiteUser,
};

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

pub(crate) fn status(status: &SiteStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "site:        {}", or_unknown(status.site_name.as_deref()));
    if let Some(url) = &status.site_url {
        let _ = writeln!(out, "url:         {url}");
    }
    let _ = writeln!(out, "core:        {}", or_unknown(status.core_version.as_deref()));
    let _ = writeln!(out, "php:         {}", or_unknown(status.php_version.as_deref()));
    let _ = writeln!(out, "agent:       {}", or_unknown(status.agent_version.as_deref()));
    let _ = writeln!(out, "theme:       {}", or_unknown(status.active_theme.as_deref()));
    if let Some(count) = status.plugin_count {
        let _ = writeln!(out, "plugins:     {count}");
    }
    let _ = writeln!(
        out,
        "maintenance: {}",
        if status.maintenance_mode { "on" } else { "off" }
    );
    out
}

pub(crate) fn health(health: &SiteHealth) -> String {
    let mut out = format!(
        "health: {}/100 ({}{})\n",
        health.score,
        health.rating,
        if health.score_reported { "" } else { ", derived" }
    );
    let _ = writeln!(
        out,
        "critical: {}  recommended: {}",
        health.critical_count, health.recommended_count
    );
    for issue in &health.issues {
        let marker = match issue.severity {
            IssueSeverity::Critical => "!!",
            IssueSeverity::Recommended => "! ",
            IssueSeverity::Good => "  ",
        };
        let _ = writeln!(out, "  {marker} {}", issue.label);
    }
    out
}

fn update_line(out: &mut String, update: &PendingUpdate) {
    let _ = writeln!(
        out,
        "  {:<6} {} ({}) {} -> {}",
        update.kind.as_str(),
        update.name,
        update.identifier,
        or_unknown(update.current_version.as_deref()),
        or_unknown(update.new_version.as_deref()),
    );
}

pub(crate) fn updates(updates: &PendingUpdates) -> String {
    let counts = updates.counts;
    let mut out = format!(
        "{} pending update(s): {} plugin(s), {} theme(s), {} core\n",
        counts.total, counts.plugins, counts.themes, counts.core
    );
    for update in updates
        .core
        .iter()
        .chain(&updates.plugins)
        .chain(&updates.themes)
    {
        update_line(&mut out, update);
    }
    out
}

pub(crate) fn plugins(plugins: &[InstalledPlugin]) -> String {
    let mut out = format!("{} plugin(s)\n", plugins.len());
    for plugin in plugins {
        let _ = write!(
            out,
            "  [{}] {} ({}) {}",
            if plugin.active { "active" } else { "      " },
            plugin.name,
            plugin.file,
            or_unknown(plugin.version.as_deref())
        );
        if let Some(next) = &plugin.update_version {
            let _ = write!(out, ", update to {next}");
        }
        out.push('\n');
    }
    out
}

pub(crate) fn themes(themes: &[InstalledTheme]) -> String {
    let mut out = format!("{} theme(s)\n", themes.len());
    for theme in themes {
        let _ = write!(
            out,
            "  [{}] {} ({}) {}",
            if theme.active { "active" } else { "      " },
            theme.name,
            theme.stylesheet,
            or_unknown(theme.version.as_deref())
        );
        if let Some(parent) = &theme.parent {
            let _ = write!(out, ", child of {parent}");
        }
        if let Some(next) = &theme.update_version {
            let _ = write!(out, ", update to {next}");
        }
        out.push('\n');
    }
    out
}

pub(crate) fn users(users: &[SiteUser]) -> String {
    let mut out = format!("{} user(s)\n", users.len());
    for user in users {
        let _ = write!(out, "  #{} {}", user.id, user.login);
        if let Some(email) = &user.email {
            let _ = write!(out, " <{email}>");
        }
        if !user.roles.is_empty() {
            let _ = write!(out, " [{}]", user.roles.join(", "));
        }
        out.push('\n');
    }
    out
}

pub(crate) fn comments(summary: &CommentSummary) -> String {
    let counts = summary.counts;
    let mut out = format!(
        "comments: {} total, {} approved, {} pending, {} spam, {} trash\n",
        counts.total, counts.approved, counts.pending, counts.spam, counts.trash
    );
    for comment in &summary.comments {
        let status = comment.status.map_or("?", |status| status.as_str());
        let _ = writeln!(
            out,
            "  #{} [{status}] {}",
            comment.id,
            or_unknown(comment.author.as_deref())
        );
    }
    out
}

fn outcome_label(outcome: &MutationOutcome) -> &'static str {
    match outcome {
        MutationOutcome::Success(_) => "ok",
        MutationOutcome::Uncertain(_) => "pending",
        MutationOutcome::Failed(_) => "failed",
    }
}

pub(crate) fn outcome(outcome: &MutationOutcome) -> String {
    format!("{}: {}\n", outcome_label(outcome), outcome.message())
}

pub(crate) fn batch(report: &BatchReport) -> String {
    if report.entries().is_empty() {
        return "nothing to update\n".to_owned();
    }
    let mut out = String::new();
    for entry in report.entries() {
        let _ = writeln!(
            out,
            "{:<8}{} {}: {}",
            outcome_label(&entry.outcome),
            entry.item.kind,
            entry.item.identifier,
            entry.outcome.message()
        );
    }
    let _ = writeln!(
        out,
        "{} succeeded, {} pending, {} failed",
        report.succeeded(),
        report.uncertain(),
        report.failed()
    );
    out
}

pub(crate) fn credential(check: &CredentialCheck) -> String {
    if check.valid {
        "credential accepted\n".to_owned()
    } else {
        format!(
            "credential rejected: {}\n",
            check.message.as_deref().unwrap_or("unknown error")
        )
    }
}
