//! Typed view of a parsed command line.

use std::ffi::OsString;
use std::time::Duration;

use clap::ArgMatches;
use clap::error::ErrorKind as ClapErrorKind;
use client::{CommentBucket, CommentFilter, CommentStatus, UpdateGroup, UpdateKind};
use logging::Verbosity;

use crate::command;

/// What the user asked for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Action {
    Status,
    Health,
    Updates,
    Plugins,
    Themes,
    Users,
    Comments(CommentFilter),
    Update { kind: UpdateKind, id: String },
    UpdateAll(Vec<UpdateGroup>),
    Activate(String),
    Deactivate(String),
    Install { slug: String, activate: bool },
    Maintenance { enabled: bool, message: Option<String> },
    DeleteComments(Vec<u64>),
    CleanComments(CommentBucket),
    Validate,
}

/// Options shared by every subcommand.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Globals {
    pub(crate) url: Option<String>,
    pub(crate) api_key: Option<String>,
    pub(crate) verbosity: Verbosity,
    pub(crate) timeout: Option<Duration>,
    pub(crate) json: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Invocation {
    pub(crate) globals: Globals,
    pub(crate) action: Action,
}

/// Outcome of argument parsing.
pub(crate) enum Parsed {
    Run(Invocation),
    /// Help or version text for stdout.
    Info(String),
    /// A usage error rendered for stderr.
    Usage(String),
}

pub(crate) fn parse<I, S>(arguments: I) -> Parsed
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let matches = match command::build().try_get_matches_from(arguments) {
        Ok(matches) => matches,
        Err(error) => {
            let rendered = error.render().to_string();
            return match error.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => Parsed::Info(rendered),
                _ => Parsed::Usage(rendered),
            };
        }
    };
    match from_matches(&matches) {
        Ok(invocation) => Parsed::Run(invocation),
        Err(message) => Parsed::Usage(format!("error: {message}\n")),
    }
}

fn globals(matches: &ArgMatches) -> Result<Globals, String> {
    let count = matches.get_count("verbose");
    let verbosity = match matches.get_one::<String>("log-level") {
        Some(level) => level.parse().map_err(|error| format!("{error}"))?,
        None => Verbosity::from_count(count),
    };
    Ok(Globals {
        url: matches.get_one::<String>("url").cloned(),
        api_key: matches.get_one::<String>("api-key").cloned(),
        verbosity,
        timeout: matches
            .get_one::<u64>("timeout")
            .map(|secs| Duration::from_secs(*secs)),
        json: matches.get_flag("json"),
    })
}

fn list(matches: &ArgMatches, name: &str) -> Vec<String> {
    matches
        .get_many::<String>(name)
        .map(|values| {
            values
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn string(matches: &ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}

fn from_matches(matches: &ArgMatches) -> Result<Invocation, String> {
    let globals = globals(matches)?;
    let Some((name, sub)) = matches.subcommand() else {
        return Err("a subcommand is required".to_owned());
    };

    let action = match name {
        "status" => Action::Status,
        "health" => Action::Health,
        "updates" => Action::Updates,
        "plugins" => Action::Plugins,
        "themes" => Action::Themes,
        "users" => Action::Users,
        "comments" => {
            let mut filter = CommentFilter::new();
            if let Some(status) = sub.get_one::<String>("status") {
                let status: CommentStatus = status.parse().map_err(|error| format!("{error}"))?;
                filter = filter.with_status(status);
            }
            if let Some(limit) = sub.get_one::<u32>("limit") {
                filter = filter.with_limit(*limit);
            }
            Action::Comments(filter)
        }
        "update" => {
            let kind: UpdateKind = string(sub, "kind")
                .parse()
                .map_err(|error| format!("{error}"))?;
            let id = match kind {
                UpdateKind::Core => "core".to_owned(),
                UpdateKind::Plugin | UpdateKind::Theme => string(sub, "id"),
            };
            Action::Update { kind, id }
        }
        "update-all" => {
            let mut groups = Vec::new();
            let plugins = list(sub, "plugins");
            if !plugins.is_empty() {
                groups.push(UpdateGroup::plugins(plugins));
            }
            let themes = list(sub, "themes");
            if !themes.is_empty() {
                groups.push(UpdateGroup::themes(themes));
            }
            if sub.get_flag("core") {
                groups.push(UpdateGroup::core());
            }
            Action::UpdateAll(groups)
        }
        "activate" => Action::Activate(string(sub, "plugin")),
        "deactivate" => Action::Deactivate(string(sub, "plugin")),
        "install" => Action::Install {
            slug: string(sub, "slug"),
            activate: sub.get_flag("activate"),
        },
        "maintenance" => Action::Maintenance {
            enabled: string(sub, "state") == "on",
            message: sub.get_one::<String>("message").cloned(),
        },
        "delete-comments" => Action::DeleteComments(
            sub.get_many::<u64>("ids")
                .map(|ids| ids.copied().collect())
                .unwrap_or_default(),
        ),
        "clean-comments" => {
            let bucket: CommentBucket = string(sub, "bucket")
                .parse()
                .map_err(|error| format!("{error}"))?;
            Action::CleanComments(bucket)
        }
        "validate" => Action::Validate,
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    Ok(Invocation { globals, action })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Invocation {
        let mut full = vec![command::PROGRAM_NAME, "--url", "https://site.test", "--api-key", "k"];
        full.extend_from_slice(args);
        match parse(full) {
            Parsed::Run(invocation) => invocation,
            Parsed::Info(text) | Parsed::Usage(text) => panic!("unexpected parse result: {text}"),
        }
    }

    #[test]
    fn globals_are_collected() {
        let invocation = run(&["-vv", "--timeout", "90", "--json", "status"]);

        assert_eq!(invocation.globals.verbosity, Verbosity::Debug);
        assert_eq!(invocation.globals.timeout, Some(Duration::from_secs(90)));
        assert!(invocation.globals.json);
        assert_eq!(invocation.globals.url.as_deref(), Some("https://site.test"));
        assert_eq!(invocation.action, Action::Status);
    }

    #[test]
    fn log_level_overrides_verbose_count() {
        let invocation = run(&["-v", "--log-level", "trace", "users"]);
        assert_eq!(invocation.globals.verbosity, Verbosity::Trace);
    }

    #[test]
    fn update_all_builds_groups() {
        let invocation = run(&["update-all", "--plugins", "akismet, hello-dolly", "--themes", "astra", "--core"]);

        assert_eq!(
            invocation.action,
            Action::UpdateAll(vec![
                UpdateGroup::plugins(["akismet", "hello-dolly"]),
                UpdateGroup::themes(["astra"]),
                UpdateGroup::core(),
            ])
        );
    }

    #[test]
    fn update_core_needs_no_identifier() {
        assert_eq!(
            run(&["update", "core"]).action,
            Action::Update {
                kind: UpdateKind::Core,
                id: "core".to_owned(),
            }
        );
        assert!(matches!(
            parse([command::PROGRAM_NAME, "update", "plugin"]),
            Parsed::Usage(_)
        ));
    }

    #[test]
    fn comment_filter_and_mutations() {
        assert_eq!(
            run(&["comments", "--status", "spam", "--limit", "5"]).action,
            Action::Comments(CommentFilter::new().with_status(CommentStatus::Spam).with_limit(5))
        );
        assert_eq!(
            run(&["maintenance", "on", "--message", "brb"]).action,
            Action::Maintenance {
                enabled: true,
                message: Some("brb".to_owned()),
            }
        );
        assert_eq!(
            run(&["delete-comments", "3", "8"]).action,
            Action::DeleteComments(vec![3, 8])
        );
        assert_eq!(
            run(&["clean-comments", "trash"]).action,
            Action::CleanComments(CommentBucket::Trash)
        );
        assert_eq!(
            run(&["install", "akismet", "--activate"]).action,
            Action::Install {
                slug: "akismet".to_owned(),
                activate: true,
            }
        );
    }

    #[test]
    fn help_and_version_are_informational() {
        assert!(matches!(parse([command::PROGRAM_NAME, "--help"]), Parsed::Info(_)));
        assert!(matches!(parse([command::PROGRAM_NAME, "--version"]), Parsed::Info(_)));
        assert!(matches!(parse([command::PROGRAM_NAME, "bogus"]), Parsed::Usage(_)));
    }
}
