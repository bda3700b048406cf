//! Reconciles the field layouts of both agent generations into one shape.
//!
//! Each normaliser accepts every layout seen in the field: bare arrays,
//! objects keyed by identifier, payloads wrapped in a named key, and
//! alternate field names. Only a top-level shape that cannot hold the
//! expected data is rejected.

use serde_json::{Map, Value};

use super::types::{
    Comment, CommentCounts, CommentStatus, CommentSummary, HealthIssue, HealthRating,
    InstalledPlugin, InstalledTheme, IssueSeverity, PendingUpdate, PendingUpdates, SiteHealth,
    SiteStatus, SiteUser, UpdateKind,
};

type Object = Map<String, Value>;

/// Descends through single wrapper keys such as `{"status": {...}}`.
fn unwrap_object<'a>(payload: &'a Value, wrappers: &[&str]) -> Option<&'a Object> {
    let object = payload.as_object()?;
    for key in wrappers {
        if let Some(inner) = object.get(*key).and_then(Value::as_object) {
            return Some(inner);
        }
    }
    Some(object)
}

/// Returns `(key, entry)` pairs from an array, a keyed object or a wrapper key.
///
/// `None` means the payload cannot be a list at all.
fn list_entries<'a>(payload: &'a Value, wrappers: &[&str]) -> Option<Vec<(Option<&'a str>, &'a Value)>> {
    match payload {
        Value::Array(items) => Some(items.iter().map(|item| (None, item)).collect()),
        Value::Object(object) => {
            for key in wrappers {
                if let Some(inner) = object.get(*key)
                    && (inner.is_array() || inner.is_object())
                {
                    return list_entries(inner, &[]);
                }
            }
            Some(
                object
                    .iter()
                    .filter(|(_, value)| value.is_object())
                    .map(|(key, value)| (Some(key.as_str()), value))
                    .collect(),
            )
        }
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn str_field(object: &Object, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(text))
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "active" | "enabled" => Some(true),
            "0" | "false" | "no" | "off" | "inactive" | "disabled" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn bool_field(object: &Object, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| object.get(*key).and_then(flag))
}

fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite() && *value >= 0.0)
                .map(|value| value.round() as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    }
}

fn u64_field(object: &Object, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| object.get(*key).and_then(count))
}

/// Derives a display name from a slug: `hello-dolly` becomes `Hello Dolly`.
pub(super) fn display_name(slug: &str) -> String {
    let stem = slug.split('/').next().unwrap_or(slug);
    let stem = stem.strip_suffix(".php").unwrap_or(stem);
    stem.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn slug_of(file: &str) -> String {
    match file.split_once('/') {
        Some((directory, _)) => directory.to_owned(),
        None => file.strip_suffix(".php").unwrap_or(file).to_owned(),
    }
}

/// Pulls the version out of either a flat field or a nested `update` object.
fn offered_version(object: &Object) -> Option<String> {
    str_field(object, &["update_version", "new_version", "update_available_version"]).or_else(|| {
        object
            .get("update")
            .and_then(Value::as_object)
            .and_then(|update| str_field(update, &["new_version", "version"]))
    })
}

pub(crate) fn site_status(payload: &Value) -> Result<SiteStatus, String> {
    let object = unwrap_object(payload, &["status", "site"])
        .ok_or_else(|| "status response is not an object".to_owned())?;

    let active_theme = match object.get("active_theme").or_else(|| object.get("theme")) {
        Some(Value::Object(theme)) => str_field(theme, &["name", "stylesheet", "slug"]),
        Some(other) => text(other),
        None => None,
    };
    let plugin_count = u64_field(
        object,
        &["plugin_count", "plugins_count", "plugins_total", "plugins"],
    );

    Ok(SiteStatus {
        site_name: str_field(object, &["site_name", "name", "blogname", "title"]),
        site_url: str_field(object, &["site_url", "url", "home_url", "home", "siteurl"]),
        core_version: str_field(
            object,
            &["core_version", "wp_version", "wordpress_version", "version"],
        ),
        php_version: str_field(object, &["php_version", "php"]),
        agent_version: str_field(
            object,
            &["agent_version", "plugin_version", "connector_version"],
        ),
        maintenance_mode: bool_field(object, &["maintenance_mode", "maintenance"])
            .unwrap_or(false),
        active_theme,
        plugin_count,
        multisite: bool_field(object, &["multisite", "is_multisite"]).unwrap_or(false),
    })
}

fn severity(value: &str) -> Option<IssueSeverity> {
    match value.trim().to_ascii_lowercase().as_str() {
        "critical" | "error" | "fail" | "failed" => Some(IssueSeverity::Critical),
        "recommended" | "warning" | "warn" => Some(IssueSeverity::Recommended),
        "good" | "pass" | "passed" | "ok" => Some(IssueSeverity::Good),
        _ => None,
    }
}

fn health_issue(entry: &Value, default: Option<IssueSeverity>) -> Option<HealthIssue> {
    match entry {
        Value::String(label) => Some(HealthIssue {
            label: label.clone(),
            severity: default?,
            description: None,
        }),
        Value::Object(object) => {
            let level = str_field(object, &["status", "severity", "type"])
                .as_deref()
                .and_then(severity)
                .or(default)?;
            Some(HealthIssue {
                label: str_field(object, &["label", "title", "name", "test"])?,
                severity: level,
                description: str_field(object, &["description", "message"]),
            })
        }
        _ => None,
    }
}

/// 100 minus 20 per critical issue and 5 per recommended one, floored at zero.
fn derived_score(critical: u64, recommended: u64) -> u8 {
    let penalty = critical.saturating_mul(20).saturating_add(recommended.saturating_mul(5));
    u8::try_from(100_u64.saturating_sub(penalty)).unwrap_or(0)
}

pub(crate) fn site_health(payload: &Value) -> Result<SiteHealth, String> {
    let root = payload
        .as_object()
        .ok_or_else(|| "health response is not an object".to_owned())?;
    let object = unwrap_object(payload, &["health"]).unwrap_or(root);

    let mut issues = Vec::new();
    if let Some(list) = object.get("issues").or_else(|| object.get("tests")) {
        for (_, entry) in list_entries(list, &[]).unwrap_or_default() {
            issues.extend(health_issue(entry, None));
        }
    }
    for (key, level) in [
        ("critical", IssueSeverity::Critical),
        ("recommended", IssueSeverity::Recommended),
    ] {
        if let Some(Value::Array(entries)) = object.get(key) {
            issues.extend(entries.iter().filter_map(|entry| health_issue(entry, Some(level))));
        }
    }

    let listed = |level: IssueSeverity| issues.iter().filter(|issue| issue.severity == level).count() as u64;
    let counts = object.get("counts").and_then(Value::as_object);
    let critical_count = counts
        .and_then(|counts| u64_field(counts, &["critical"]))
        .or_else(|| u64_field(object, &["critical_count", "critical"]))
        .unwrap_or_else(|| listed(IssueSeverity::Critical));
    let recommended_count = counts
        .and_then(|counts| u64_field(counts, &["recommended"]))
        .or_else(|| u64_field(object, &["recommended_count", "recommended"]))
        .unwrap_or_else(|| listed(IssueSeverity::Recommended));

    let reported = u64_field(object, &["score", "health_score"])
        .or_else(|| u64_field(root, &["score", "health_score"]));
    let (score, score_reported) = match reported {
        Some(score) => (u8::try_from(score.min(100)).unwrap_or(100), true),
        None => (derived_score(critical_count, recommended_count), false),
    };

    Ok(SiteHealth {
        score,
        rating: HealthRating::from_score(score),
        score_reported,
        critical_count,
        recommended_count,
        issues,
    })
}

fn plugin_update(key: Option<&str>, entry: &Value) -> Option<PendingUpdate> {
    let object = entry.as_object()?;
    let identifier = str_field(object, &["file", "plugin", "basename", "slug"])
        .or_else(|| key.map(str::to_owned))?;
    update_entry(UpdateKind::Plugin, identifier, object)
}

fn theme_update(key: Option<&str>, entry: &Value) -> Option<PendingUpdate> {
    let object = entry.as_object()?;
    let identifier = str_field(object, &["stylesheet", "slug", "theme"])
        .or_else(|| key.map(str::to_owned))?;
    update_entry(UpdateKind::Theme, identifier, object)
}

fn update_entry(kind: UpdateKind, identifier: String, object: &Object) -> Option<PendingUpdate> {
    let new_version = offered_version(object);
    let current_version = str_field(
        object,
        &["current_version", "version", "Version", "old_version", "installed_version"],
    );
    if new_version.is_some() && new_version == current_version {
        return None;
    }
    Some(PendingUpdate {
        kind,
        name: str_field(object, &["name", "Name", "title"])
            .unwrap_or_else(|| display_name(&identifier)),
        identifier,
        current_version,
        new_version,
    })
}

fn core_update(value: &Value) -> Option<PendingUpdate> {
    let offer = match value {
        Value::Array(offers) => offers.iter().find(|offer| {
            offer
                .get("response")
                .and_then(Value::as_str)
                .is_none_or(|response| response == "upgrade")
        })?,
        Value::Object(_) => value,
        _ => return None,
    };
    let object = offer.as_object()?;
    if bool_field(object, &["available", "update_available"]) == Some(false) {
        return None;
    }
    let current_version = str_field(object, &["current_version", "installed_version", "installed"]);
    let new_version = str_field(
        object,
        &["new_version", "latest_version", "latest", "update_version", "current", "version"],
    )?;
    if current_version.as_deref() == Some(new_version.as_str()) {
        return None;
    }
    Some(PendingUpdate {
        kind: UpdateKind::Core,
        identifier: "core".to_owned(),
        name: "Core".to_owned(),
        current_version,
        new_version: Some(new_version),
    })
}

pub(crate) fn pending_updates(payload: &Value) -> Result<PendingUpdates, String> {
    let object = unwrap_object(payload, &["updates"])
        .ok_or_else(|| "updates response is not an object".to_owned())?;

    let collect = |keys: &[&str], build: fn(Option<&str>, &Value) -> Option<PendingUpdate>| {
        keys.iter()
            .find_map(|key| object.get(*key))
            .and_then(|list| list_entries(list, &[]))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, entry)| build(key, entry))
            .collect::<Vec<_>>()
    };
    let plugins = collect(&["plugins", "plugin_updates", "plugin"], plugin_update);
    let themes = collect(&["themes", "theme_updates", "theme"], theme_update);
    let core = ["core", "core_update", "wordpress"]
        .iter()
        .find_map(|key| object.get(*key))
        .and_then(core_update);

    Ok(PendingUpdates::new(core, plugins, themes))
}

fn plugin(key: Option<&str>, entry: &Value) -> Option<InstalledPlugin> {
    let object = entry.as_object()?;
    let file = str_field(object, &["file", "plugin", "basename", "plugin_file"])
        .or_else(|| key.map(str::to_owned))
        .or_else(|| str_field(object, &["slug"]))?;
    let slug = str_field(object, &["slug"]).unwrap_or_else(|| slug_of(&file));
    let active = bool_field(object, &["active", "is_active"])
        .or_else(|| str_field(object, &["status"]).map(|status| status == "active"))
        .unwrap_or(false);
    let author = match object.get("author").or_else(|| object.get("Author")) {
        Some(Value::Object(author)) => str_field(author, &["name", "display_name"]),
        Some(other) => text(other),
        None => None,
    };
    Some(InstalledPlugin {
        name: str_field(object, &["name", "Name", "title"]).unwrap_or_else(|| display_name(&slug)),
        version: str_field(object, &["version", "Version"]),
        update_version: offered_version(object),
        active,
        author,
        file,
        slug,
    })
}

fn theme(key: Option<&str>, entry: &Value) -> Option<InstalledTheme> {
    let object = entry.as_object()?;
    let stylesheet = str_field(object, &["stylesheet", "slug", "theme"])
        .or_else(|| key.map(str::to_owned))?;
    let active = bool_field(object, &["active", "is_active"])
        .or_else(|| str_field(object, &["status"]).map(|status| status == "active"))
        .unwrap_or(false);
    let parent = str_field(object, &["parent", "template"]).filter(|parent| *parent != stylesheet);
    Some(InstalledTheme {
        name: str_field(object, &["name", "Name", "title"])
            .unwrap_or_else(|| display_name(&stylesheet)),
        version: str_field(object, &["version", "Version"]),
        update_version: offered_version(object),
        active,
        parent,
        stylesheet,
    })
}

pub(crate) fn plugins(payload: &Value) -> Result<Vec<InstalledPlugin>, String> {
    list_entries(payload, &["plugins", "data", "items"])
        .map(|entries| entries.into_iter().filter_map(|(key, entry)| plugin(key, entry)).collect())
        .ok_or_else(|| "plugin list response is neither a list nor an object".to_owned())
}

pub(crate) fn themes(payload: &Value) -> Result<Vec<InstalledTheme>, String> {
    list_entries(payload, &["themes", "data", "items"])
        .map(|entries| entries.into_iter().filter_map(|(key, entry)| theme(key, entry)).collect())
        .ok_or_else(|| "theme list response is neither a list nor an object".to_owned())
}

fn user(entry: &Value) -> Option<SiteUser> {
    let object = entry.as_object()?;
    let roles = match object.get("roles").or_else(|| object.get("role")) {
        Some(Value::Array(roles)) => roles.iter().filter_map(text).collect(),
        Some(Value::Object(roles)) => roles.keys().cloned().collect(),
        Some(other) => text(other).into_iter().collect(),
        None => Vec::new(),
    };
    Some(SiteUser {
        id: u64_field(object, &["id", "ID", "user_id"])?,
        login: str_field(object, &["login", "user_login", "username"])?,
        email: str_field(object, &["email", "user_email"]),
        display_name: str_field(object, &["display_name", "name"]),
        roles,
        registered: str_field(object, &["registered", "user_registered"]),
    })
}

pub(crate) fn users(payload: &Value) -> Result<Vec<SiteUser>, String> {
    list_entries(payload, &["users", "data", "items"])
        .map(|entries| entries.into_iter().filter_map(|(_, entry)| user(entry)).collect())
        .ok_or_else(|| "user list response is neither a list nor an object".to_owned())
}

fn comment(entry: &Value) -> Option<Comment> {
    let object = entry.as_object()?;
    Some(Comment {
        id: u64_field(object, &["id", "comment_ID", "comment_id"])?,
        post_id: u64_field(object, &["post_id", "comment_post_ID", "post"]),
        author: str_field(object, &["author", "comment_author", "author_name"]),
        content: str_field(object, &["content", "comment_content", "excerpt"]),
        status: str_field(object, &["status", "comment_approved", "approved"])
            .and_then(|status| status.parse::<CommentStatus>().ok()),
        date: str_field(object, &["date", "comment_date"]),
    })
}

fn comment_counts(object: &Object) -> Option<CommentCounts> {
    let total = u64_field(object, &["total", "all", "total_comments"]);
    let approved = u64_field(object, &["approved", "approve"]);
    let pending = u64_field(object, &["pending", "moderated", "awaiting_moderation", "hold"]);
    let spam = u64_field(object, &["spam"]);
    let trash = u64_field(object, &["trash"]);
    if [total, approved, pending, spam, trash].iter().all(Option::is_none) {
        return None;
    }
    let (approved, pending, spam, trash) = (
        approved.unwrap_or(0),
        pending.unwrap_or(0),
        spam.unwrap_or(0),
        trash.unwrap_or(0),
    );
    Some(CommentCounts {
        total: total.unwrap_or(approved + pending + spam + trash),
        approved,
        pending,
        spam,
        trash,
    })
}

fn counts_from(comments: &[Comment]) -> CommentCounts {
    let mut counts = CommentCounts {
        total: comments.len() as u64,
        ..CommentCounts::default()
    };
    for comment in comments {
        match comment.status {
            Some(CommentStatus::Approved) => counts.approved += 1,
            Some(CommentStatus::Pending) => counts.pending += 1,
            Some(CommentStatus::Spam) => counts.spam += 1,
            Some(CommentStatus::Trash) => counts.trash += 1,
            None => {}
        }
    }
    counts
}

pub(crate) fn comments(payload: &Value) -> Result<CommentSummary, String> {
    match payload {
        Value::Array(_) | Value::Null => {
            let comments: Vec<Comment> = list_entries(payload, &[])
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(_, entry)| comment(entry))
                .collect();
            Ok(CommentSummary {
                counts: counts_from(&comments),
                comments,
            })
        }
        Value::Object(object) => {
            let comments: Vec<Comment> = object
                .get("comments")
                .or_else(|| object.get("items"))
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(comment).collect())
                .unwrap_or_default();
            let counts = ["counts", "stats", "comment_counts"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_object))
                .and_then(comment_counts)
                .or_else(|| comment_counts(object))
                .unwrap_or_else(|| counts_from(&comments));
            Ok(CommentSummary { counts, comments })
        }
        _ => Err("comment response is neither a list nor an object".to_owned()),
    }
}
