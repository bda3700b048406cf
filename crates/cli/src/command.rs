//! Clap command definition.

use clap::{Arg, ArgAction, Command, value_parser};

/// Program name used in usage lines and diagnostics.
pub const PROGRAM_NAME: &str = "sitewarden";

/// Environment variable holding the site base URL.
pub const URL_ENV: &str = "SITEWARDEN_URL";

/// Environment variable holding the site API key.
pub const API_KEY_ENV: &str = "SITEWARDEN_API_KEY";

fn identifier(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).value_name(value_name).required(true).help(help)
}

pub(crate) fn build() -> Command {
    Command::new(PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect and maintain a remote site through its management agent")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("url")
                .long("url")
                .env(URL_ENV)
                .value_name("URL")
                .global(true)
                .help("Base URL of the site"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .env(API_KEY_ENV)
                .hide_env_values(true)
                .value_name("KEY")
                .global(true)
                .help("API key issued by the site's management agent"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase diagnostic output (repeatable)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["quiet", "normal", "info", "debug", "trace"])
                .global(true)
                .help("Set the diagnostic level explicitly"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .value_parser(value_parser!(u64).range(1..))
                .global(true)
                .help("Give up on the whole command after SECS seconds"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Print results as JSON"),
        )
        .subcommand(Command::new("status").about("Show site status"))
        .subcommand(Command::new("health").about("Show the site health report"))
        .subcommand(Command::new("updates").about("List pending software updates"))
        .subcommand(Command::new("plugins").about("List installed plugins"))
        .subcommand(Command::new("themes").about("List installed themes"))
        .subcommand(Command::new("users").about("List site users"))
        .subcommand(
            Command::new("comments")
                .about("Show comment counts and recent comments")
                .arg(
                    Arg::new("status")
                        .long("status")
                        .value_name("STATUS")
                        .help("Only comments with this status (approved, pending, spam, trash)"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_name("N")
                        .value_parser(value_parser!(u32).range(1..))
                        .help("Return at most N comments"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Update one plugin, one theme or the core")
                .arg(
                    Arg::new("kind")
                        .value_name("KIND")
                        .required(true)
                        .value_parser(["plugin", "theme", "core"]),
                )
                .arg(
                    Arg::new("id")
                        .value_name("ID")
                        .required_if_eq_any([("kind", "plugin"), ("kind", "theme")])
                        .help("Plugin file or slug, or theme stylesheet"),
                ),
        )
        .subcommand(
            Command::new("update-all")
                .about("Update several components in one batch")
                .arg(
                    Arg::new("plugins")
                        .long("plugins")
                        .value_name("LIST")
                        .value_delimiter(',')
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("themes")
                        .long("themes")
                        .value_name("LIST")
                        .value_delimiter(',')
                        .action(ArgAction::Append),
                )
                .arg(Arg::new("core").long("core").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("activate")
                .about("Activate a plugin")
                .arg(identifier("plugin", "PLUGIN", "Plugin file or slug")),
        )
        .subcommand(
            Command::new("deactivate")
                .about("Deactivate a plugin")
                .arg(identifier("plugin", "PLUGIN", "Plugin file or slug")),
        )
        .subcommand(
            Command::new("install")
                .about("Install a plugin from the public directory")
                .arg(identifier("slug", "SLUG", "Directory slug"))
                .arg(
                    Arg::new("activate")
                        .long("activate")
                        .action(ArgAction::SetTrue)
                        .help("Activate the plugin once installed"),
                ),
        )
        .subcommand(
            Command::new("maintenance")
                .about("Turn maintenance mode on or off")
                .arg(
                    Arg::new("state")
                        .value_name("STATE")
                        .required(true)
                        .value_parser(["on", "off"]),
                )
                .arg(
                    Arg::new("message")
                        .long("message")
                        .value_name("TEXT")
                        .help("Message shown to visitors"),
                ),
        )
        .subcommand(
            Command::new("delete-comments")
                .about("Delete comments by id")
                .arg(
                    Arg::new("ids")
                        .value_name("ID")
                        .num_args(1..)
                        .required(true)
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("clean-comments")
                .about("Permanently empty the spam or trash bucket")
                .arg(
                    Arg::new("bucket")
                        .value_name("BUCKET")
                        .required(true)
                        .value_parser(["spam", "trash"]),
                ),
        )
        .subcommand(Command::new("validate").about("Check that the API key is accepted"))
}
