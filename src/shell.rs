//! Line-oriented driver for the application. Each command becomes an
//! [`Action`]; after it runs the current page and any pending toasts are
//! printed.

use std::collections::HashMap;
use std::error::Error;

use eventhub::app::{Action, App};
use eventhub::config::Config;
use eventhub::router::{Outcome, Resolution};
use eventhub::ui::ToastKind;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
go <path>                      navigate to a location, e.g. go /events/3
back | forward | reload        move through history
login <username-or-email>      prompts for the password
logout
do <action> [key=value ...]    run a page action, e.g. do search q=\"jazz night\"
whoami
page                           print the current page again
help | quit";

pub async fn run(config: &Config, initial_path: &str) -> Result<(), Box<dyn Error>> {
    let app = App::new(config);
    let resolution = app.start(initial_path).await;
    print_resolution(&app, Some(resolution));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let action = match command {
            "quit" | "exit" => break,
            "help" => {
                println!("{HELP}");
                continue;
            }
            "whoami" => {
                match app.auth().current_user() {
                    Some(user) => println!(
                        "{} <{}> ({})",
                        user.username,
                        user.email,
                        user.role.as_str()
                    ),
                    None => println!("not logged in"),
                }
                continue;
            }
            "page" => {
                print_resolution(&app, None);
                continue;
            }
            "go" => Action::Navigate(rest.to_string()),
            "back" => Action::Back,
            "forward" => Action::Forward,
            "reload" => Action::Reload,
            "logout" => Action::Logout,
            "login" => {
                let identifier = rest.to_string();
                let password =
                    tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: "))
                        .await??;
                Action::Login {
                    identifier,
                    password,
                }
            }
            "do" => {
                let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
                let fields = match parse_fields(args) {
                    Ok(fields) => fields,
                    Err(e) => {
                        println!("! {e}");
                        continue;
                    }
                };
                match Action::parse(name, &fields) {
                    Ok(action) => action,
                    Err(e) => {
                        println!("! {e}");
                        continue;
                    }
                }
            }
            other => {
                println!("unknown command: {other} (try help)");
                continue;
            }
        };

        let resolution = app.dispatch(action).await;
        print_resolution(&app, resolution);
    }

    Ok(())
}

/// Shell-style `key=value` words. Values are taken verbatim; quote them to
/// include spaces, e.g. `title="Sauna night"`.
fn parse_fields(args: &str) -> Result<HashMap<String, String>, String> {
    let words = shlex::split(args).ok_or_else(|| format!("unbalanced quotes in: {args}"))?;
    words
        .into_iter()
        .map(|word| match word.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), value.to_string())),
            None => Err(format!("expected key=value, got {word}")),
        })
        .collect()
}

fn print_resolution(app: &App, resolution: Option<Resolution>) {
    if let Some(resolution) = resolution {
        let note = match &resolution.outcome {
            Outcome::Rendered => String::new(),
            Outcome::Redirected { from } => format!(" (redirected from {from})"),
            Outcome::AccessDenied => " (access denied)".to_string(),
            Outcome::NotFound => " (not found)".to_string(),
            Outcome::Failed(reason) => format!(" (failed: {reason})"),
        };
        println!("== #{}{note}", resolution.path);
    }

    if let Some(view) = app.ui().view() {
        println!("# {}\n{}", view.title, view.html);
    }
    if let Some(modal) = app.ui().modal() {
        println!("[modal: {}]\n{}", modal.title, modal.body);
    }
    for (field, message) in app.ui().field_errors() {
        println!("! {field}: {message}");
    }
    for toast in app.ui().take_toasts() {
        let tag = match toast.kind {
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
            ToastKind::Warning => "warn",
        };
        println!("[{tag}] {}", toast.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_are_kept_verbatim() {
        let fields = parse_fields("username=john_doe email=john_doe@x.fi").unwrap();
        assert_eq!(fields["username"], "john_doe");
        assert_eq!(fields["email"], "john_doe@x.fi");
    }

    #[test]
    fn quoted_values_may_contain_spaces() {
        let fields = parse_fields(r#"title="Sauna night" q='a = b' id=3"#).unwrap();
        assert_eq!(fields["title"], "Sauna night");
        assert_eq!(fields["q"], "a = b");
        assert_eq!(fields["id"], "3");
        assert!(parse_fields("").unwrap().is_empty());
    }

    #[test]
    fn malformed_input_is_reported() {
        assert!(parse_fields(r#"title="open"#).is_err());
        assert!(parse_fields("orphan").is_err());
    }
}
