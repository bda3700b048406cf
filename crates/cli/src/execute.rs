//! Runs a parsed invocation against a site and prints the result.

use std::io::{self, Write};

use client::{
    ClientConfig, ClientError, ErrorKind, MutationOutcome, SiteClient, SiteCredential, UpdateKind,
};
use serde::Serialize;

use crate::command::{API_KEY_ENV, PROGRAM_NAME, URL_ENV};
use crate::invocation::{Action, Globals, Invocation};
use crate::render;

/// Exit code for usage and configuration errors.
pub const USAGE_EXIT_CODE: i32 = 1;

/// Exit code used when standard output cannot be written.
const OUTPUT_EXIT_CODE: i32 = 1;

/// Builds the site client from global options and the environment.
pub(crate) fn connect(globals: &Globals) -> Result<SiteClient, String> {
    let url = globals
        .url
        .as_deref()
        .ok_or_else(|| format!("no site URL given (use --url or {URL_ENV})"))?;
    let api_key = globals
        .api_key
        .as_deref()
        .ok_or_else(|| format!("no API key given (use --api-key or {API_KEY_ENV})"))?;
    let credential = SiteCredential::new(url, api_key).map_err(|error| error.to_string())?;
    let config = ClientConfig::from_env().map_err(|error| error.to_string())?;
    let site = SiteClient::with_config(credential, config).map_err(|error| error.to_string())?;
    Ok(match globals.timeout {
        Some(timeout) => site.with_deadline_in(timeout),
        None => site,
    })
}

/// Where results go and in which format.
struct Output<'a, Out, Err> {
    stdout: &'a mut Out,
    stderr: &'a mut Err,
    json: bool,
}

impl<Out: Write, Err: Write> Output<'_, Out, Err> {
    fn value<T: Serialize>(&mut self, value: &T, text: impl FnOnce(&T) -> String) -> io::Result<()> {
        if self.json {
            let rendered = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
            writeln!(self.stdout, "{rendered}")
        } else {
            self.stdout.write_all(text(value).as_bytes())
        }
    }

    fn read<T: Serialize>(
        &mut self,
        result: Result<T, ClientError>,
        text: impl FnOnce(&T) -> String,
    ) -> io::Result<i32> {
        match result {
            Ok(value) => self.value(&value, text).map(|()| 0),
            Err(error) => self.error(&error),
        }
    }

    fn error(&mut self, error: &ClientError) -> io::Result<i32> {
        if self.json {
            self.value(&serde_json::json!({"error": error}), |_| String::new())?;
        } else {
            writeln!(
                self.stderr,
                "{PROGRAM_NAME}: {}: {}",
                error.kind().description(),
                error.message()
            )?;
        }
        Ok(error.kind().exit_code())
    }

    fn outcome(&mut self, outcome: &MutationOutcome) -> io::Result<i32> {
        self.value(outcome, render::outcome)?;
        Ok(outcome.exit_code())
    }
}

/// Executes `invocation.action` through `site` and returns the exit code.
pub(crate) fn execute<Out, Err>(
    site: &SiteClient,
    invocation: &Invocation,
    stdout: &mut Out,
    stderr: &mut Err,
) -> i32
where
    Out: Write,
    Err: Write,
{
    let mut output = Output {
        stdout,
        stderr,
        json: invocation.globals.json,
    };
    match dispatch(site, &invocation.action, &mut output) {
        Ok(code) => code,
        Err(error) => {
            let _ = writeln!(output.stderr, "{PROGRAM_NAME}: failed to write output: {error}");
            OUTPUT_EXIT_CODE
        }
    }
}

fn dispatch<Out: Write, Err: Write>(
    site: &SiteClient,
    action: &Action,
    output: &mut Output<'_, Out, Err>,
) -> io::Result<i32> {
    match action {
        Action::Status => output.read(site.get_status(), render::status),
        Action::Health => output.read(site.get_health(), render::health),
        Action::Updates => output.read(site.get_updates(), render::updates),
        Action::Plugins => output.read(site.get_plugins(), |plugins| render::plugins(plugins)),
        Action::Themes => output.read(site.get_themes(), |themes| render::themes(themes)),
        Action::Users => output.read(site.get_users(), |users| render::users(users)),
        Action::Comments(filter) => output.read(site.get_comments(filter), render::comments),
        Action::Update { kind, id } => output.outcome(&match kind {
            UpdateKind::Plugin => site.update_plugin(id),
            UpdateKind::Theme => site.update_theme(id),
            UpdateKind::Core => site.update_core(),
        }),
        Action::UpdateAll(groups) => {
            let report = site.perform_updates(groups);
            output.value(&report, render::batch)?;
            Ok(report.exit_code())
        }
        Action::Activate(plugin) => output.outcome(&site.activate_plugin(plugin)),
        Action::Deactivate(plugin) => output.outcome(&site.deactivate_plugin(plugin)),
        Action::Install { slug, activate } => output.outcome(&site.install_plugin(slug, *activate)),
        Action::Maintenance { enabled, message } => {
            output.outcome(&site.toggle_maintenance(*enabled, message.as_deref()))
        }
        Action::DeleteComments(ids) => output.outcome(&site.delete_comments(ids)),
        Action::CleanComments(bucket) => output.outcome(&site.clean_comments(*bucket)),
        Action::Validate => {
            let check = site.validate_credential();
            output.value(&check, render::credential)?;
            Ok(check.error.map_or(0, ErrorKind::exit_code))
        }
    }
}
