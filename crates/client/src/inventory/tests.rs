use serde_json::json;
use wire::Namespace;

use super::normalize::{self, display_name};
use super::*;
use crate::testing::{Harness, Reply};

#[test]
fn pending_update_counts_by_kind() {
    let harness = Harness::new();
    harness.backend.on(
        Namespace::Current,
        "updates",
        Reply::ok(json!({
            "plugins": [
                {"file": "akismet/akismet.php", "name": "Akismet", "version": "5.8.1", "new_version": "5.8.2"},
                {"file": "hello-dolly/hello.php", "version": "1.7.1", "new_version": "1.7.2"}
            ],
            "themes": [],
            "core": null
        })),
    );

    let updates = harness.client.get_updates().unwrap();

    assert_eq!(
        updates.counts,
        UpdateCounts {
            total: 2,
            plugins: 2,
            themes: 0,
            core: 0,
        }
    );
    assert_eq!(updates.plugins[1].name, "Hello Dolly");
    assert_eq!(
        updates
            .find(UpdateKind::Plugin, "akismet")
            .and_then(|update| update.new_version.as_deref()),
        Some("5.8.2")
    );
}

#[test]
fn legacy_keyed_update_layout_is_normalised() {
    let payload = json!({
        "updates": {
            "plugin_updates": {
                "akismet/akismet.php": {"Name": "Akismet", "Version": "5.8.1", "update": {"new_version": "5.8.2"}}
            },
            "theme_updates": {
                "twentytwentyfour": {"Version": "1.0", "new_version": "1.2"}
            },
            "core_update": [
                {"response": "latest", "current": "6.5"},
                {"response": "upgrade", "current": "6.6", "installed_version": "6.5"}
            ]
        }
    });

    let updates = normalize::pending_updates(&payload).unwrap();

    assert_eq!(updates.counts.total, 3);
    assert_eq!(updates.plugins[0].identifier, "akismet/akismet.php");
    assert_eq!(updates.plugins[0].current_version.as_deref(), Some("5.8.1"));
    assert_eq!(updates.themes[0].name, "Twentytwentyfour");
    let core = updates.core.unwrap();
    assert_eq!(core.new_version.as_deref(), Some("6.6"));
    assert_eq!(core.current_version.as_deref(), Some("6.5"));
}

#[test]
fn core_without_newer_version_is_not_pending() {
    let payload = json!({"core": {"current_version": "6.6", "new_version": "6.6"}});
    assert!(normalize::pending_updates(&payload).unwrap().is_empty());

    let payload = json!({"core": {"available": false, "new_version": "6.6"}});
    assert!(normalize::pending_updates(&payload).unwrap().core.is_none());
}

#[test]
fn plugins_accept_array_and_keyed_layouts() {
    let array = json!([
        {"file": "akismet/akismet.php", "name": "Akismet", "version": "5.8.1", "active": true, "author": {"name": "Automattic"}},
        {"plugin": "hello.php", "version": "1.7.2", "status": "inactive"}
    ]);
    let plugins = normalize::plugins(&array).unwrap();
    assert_eq!(plugins.len(), 2);
    assert!(plugins[0].active);
    assert_eq!(plugins[0].slug, "akismet");
    assert_eq!(plugins[0].author.as_deref(), Some("Automattic"));
    assert_eq!(plugins[1].slug, "hello");
    assert_eq!(plugins[1].name, "Hello");
    assert!(!plugins[1].active);

    let keyed = json!({
        "plugins": {
            "akismet/akismet.php": {"Name": "Akismet", "Version": "5.8.1", "is_active": "1", "update_version": "5.8.2"}
        }
    });
    let plugins = normalize::plugins(&keyed).unwrap();
    assert_eq!(plugins[0].file, "akismet/akismet.php");
    assert!(plugins[0].active);
    assert_eq!(plugins[0].update_version.as_deref(), Some("5.8.2"));
    assert!(plugins[0].matches("akismet"));
    assert!(plugins[0].matches("akismet/akismet.php"));
    assert!(!plugins[0].matches("akis"));
}

#[test]
fn themes_record_parent_only_for_child_themes() {
    let payload = json!([
        {"stylesheet": "astra-child", "template": "astra", "active": true},
        {"stylesheet": "astra", "template": "astra", "version": "4.6"}
    ]);

    let themes = normalize::themes(&payload).unwrap();

    assert_eq!(themes[0].parent.as_deref(), Some("astra"));
    assert_eq!(themes[0].name, "Astra Child");
    assert_eq!(themes[1].parent, None);
}

#[test]
fn users_accept_core_field_names() {
    let payload = json!({"users": [
        {"ID": "7", "user_login": "editor", "user_email": "e@example.test", "roles": ["editor"]},
        {"id": 1, "login": "admin", "role": "administrator"},
        {"login": "missing-id"}
    ]});

    let users = normalize::users(&payload).unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].id, 7);
    assert_eq!(users[0].email.as_deref(), Some("e@example.test"));
    assert_eq!(users[1].roles, vec!["administrator".to_owned()]);
}

#[test]
fn health_score_is_derived_when_absent() {
    let payload = json!({
        "issues": [
            {"label": "Backups missing", "status": "critical"},
            {"label": "Old PHP", "status": "recommended"},
            {"label": "Cron slow", "status": "recommended"},
            {"label": "HTTPS", "status": "good"}
        ]
    });

    let health = normalize::site_health(&payload).unwrap();

    assert_eq!(health.critical_count, 1);
    assert_eq!(health.recommended_count, 2);
    assert_eq!(health.score, 70);
    assert!(!health.score_reported);
    assert_eq!(health.rating, HealthRating::Recommended);
    assert_eq!(health.issues.len(), 4);
}

#[test]
fn reported_health_score_wins_and_is_clamped() {
    let nested = normalize::site_health(&json!({"health": {"score": 92}})).unwrap();
    assert_eq!(nested.score, 92);
    assert!(nested.score_reported);
    assert_eq!(nested.rating, HealthRating::Good);

    let clamped = normalize::site_health(&json!({"health_score": 140})).unwrap();
    assert_eq!(clamped.score, 100);

    let floored = normalize::site_health(&json!({"critical": 7})).unwrap();
    assert_eq!(floored.score, 0);
    assert_eq!(floored.rating, HealthRating::Critical);
}

#[test]
fn comment_counts_are_taken_or_derived() {
    let reported = normalize::comments(&json!({
        "counts": {"all": 12, "approved": 9, "moderated": 1, "spam": 2, "trash": 0}
    }))
    .unwrap();
    assert_eq!(reported.counts.total, 12);
    assert_eq!(reported.counts.pending, 1);
    assert_eq!(reported.counts.bucket(CommentBucket::Spam), 2);

    let derived = normalize::comments(&json!([
        {"comment_ID": "3", "comment_approved": "spam", "comment_author": "bot"},
        {"id": 4, "status": "approved"}
    ]))
    .unwrap();
    assert_eq!(derived.counts.total, 2);
    assert_eq!(derived.counts.spam, 1);
    assert_eq!(derived.comments[0].id, 3);
}

#[test]
fn comment_filter_becomes_query_parameters() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "comments", Reply::ok(json!({"comments": []})));

    harness
        .client
        .get_comments(&CommentFilter::new().with_status(CommentStatus::Spam).with_limit(20))
        .unwrap();

    assert_eq!(
        harness.backend.requests()[0].query,
        vec![
            ("status".to_owned(), "spam".to_owned()),
            ("limit".to_owned(), "20".to_owned()),
        ]
    );
}

#[test]
fn status_unwraps_envelope_and_alternate_names() {
    let harness = Harness::new();
    harness.backend.on(
        Namespace::Legacy,
        "site-status",
        Reply::ok(json!({
            "success": true,
            "data": {"blogname": "Shop", "wp_version": "6.5.2", "maintenance": "on", "active_theme": {"name": "Astra"}}
        })),
    );

    let status = harness.client.get_status().unwrap();

    assert_eq!(status.site_name.as_deref(), Some("Shop"));
    assert_eq!(status.core_version.as_deref(), Some("6.5.2"));
    assert!(status.maintenance_mode);
    assert_eq!(status.active_theme.as_deref(), Some("Astra"));
}

#[test]
fn wrong_top_level_shape_is_malformed() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", Reply::ok(json!("nothing here")));

    let error = harness.client.get_plugins().unwrap_err();

    assert_eq!(error.kind(), crate::ErrorKind::MalformedRemoteResponse);
    assert_eq!(error.operation(), Some(wire::Operation::GetPlugins));
}

#[test]
fn display_names_come_from_slugs() {
    assert_eq!(display_name("hello-dolly"), "Hello Dolly");
    assert_eq!(display_name("wp_super_cache"), "Wp Super Cache");
    assert_eq!(display_name("akismet/akismet.php"), "Akismet");
}
