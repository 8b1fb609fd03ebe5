use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc, time::Duration};

mod cli_style;

use cli_style::{get_styles, print_error, print_key_value, print_success};
use music_catalog_server::catalog_store::{PageRequest, MAX_PAGE_LIMIT};
use music_catalog_server::config::DEFAULT_BUSY_TIMEOUT_MS;
use music_catalog_server::user::{SqliteUserStore, User, UserManager, UserRole};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the user database (user.db inside the server's db dir).
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates a user with the given email and password.
    AddUser {
        email: String,
        password: String,
        /// One of admin, editor, viewer.
        #[arg(long, default_value = "viewer")]
        role: String,
    },

    /// Changes the role of a user.
    SetRole { email: String, role: String },

    /// Replaces the password of a user, without asking for the old one.
    SetPassword { email: String, password: String },

    /// Verifies the password of a given user, it doesn't make any
    /// persistent change, nor it creates any token, it just
    /// compares the password hash.
    CheckPassword { email: String, password: String },

    /// Shows all users, optionally only those with a role.
    ListUsers {
        #[arg(long)]
        role: Option<String>,
    },

    /// Deletes a user and all of their favorites.
    DeleteUser { email: String },

    /// Shows the path of the current user db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

fn parse_role(role: &str) -> Result<UserRole, String> {
    UserRole::from_str(role).ok_or_else(|| {
        format!(
            "Invalid role '{}'. Valid roles are: admin, editor, viewer",
            role
        )
    })
}

fn find_user(user_manager: &UserManager, email: &str) -> Result<User, String> {
    user_manager
        .get_user_by_email(email)
        .map_err(|err| format!("{} ({})", err, email))
}

fn all_users(user_manager: &UserManager, role: Option<UserRole>) -> Result<Vec<User>, String> {
    let mut users = Vec::new();
    loop {
        let page = PageRequest::new(Some(MAX_PAGE_LIMIT), Some(users.len()));
        let batch = user_manager
            .list_users(role, page)
            .map_err(|err| err.to_string())?;
        let done = batch.len() < MAX_PAGE_LIMIT;
        users.extend(batch);
        if done {
            return Ok(users);
        }
    }
}

fn run(command: InnerCommand, user_manager: &UserManager, db_path: &str) -> Result<bool, String> {
    match command {
        InnerCommand::AddUser {
            email,
            password,
            role,
        } => {
            let role = parse_role(&role)?;
            let user = user_manager
                .add_user(&email, &password, role)
                .map_err(|err| err.to_string())?;
            print_success(&format!("Created {} with role {}", user.email, user.role));
            print_key_value("user_id", &user.id);
        }
        InnerCommand::SetRole { email, role } => {
            let role = parse_role(&role)?;
            let user = find_user(user_manager, &email)?;
            user_manager
                .update_user(&user.id, None, Some(role))
                .map_err(|err| err.to_string())?;
            print_success(&format!("Role of {} is now {}", user.email, role));
        }
        InnerCommand::SetPassword { email, password } => {
            let user = find_user(user_manager, &email)?;
            user_manager
                .set_password(&user.id, &password)
                .map_err(|err| err.to_string())?;
            print_success(&format!("Password of {} updated", user.email));
        }
        InnerCommand::CheckPassword { email, password } => {
            match user_manager.check_password(&email, &password) {
                Ok(true) => print_success("The password provided is correct!"),
                Ok(false) => print_error("Wrong password."),
                Err(err) => {
                    return Err(format!(
                        "Could not verify the password, something went wrong: {}",
                        err
                    ))
                }
            }
        }
        InnerCommand::ListUsers { role } => {
            let role = role.as_deref().map(parse_role).transpose()?;
            let users = all_users(user_manager, role)?;
            if users.is_empty() {
                println!("  (no users)");
            }
            for user in users.iter() {
                print_key_value(user.role.as_str(), &format!("{} {}", user.email, user.id));
            }
        }
        InnerCommand::DeleteUser { email } => {
            let user = find_user(user_manager, &email)?;
            user_manager
                .delete_user(&user.id)
                .map_err(|err| err.to_string())?;
            print_success(&format!("Deleted {}", user.email));
        }
        InnerCommand::Where => {
            println!("{}", db_path);
        }
        InnerCommand::Exit => return Ok(false),
    }
    Ok(true)
}

fn execute_command(line: String, user_manager: &UserManager, db_path: &str) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            println!("{} {}", PROMPT, &line);
            match run(cli.command, user_manager, db_path) {
                Ok(true) => CommandExecutionResult::Ok,
                Ok(false) => CommandExecutionResult::Exit,
                Err(err) => CommandExecutionResult::Error(err),
            }
        }
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            CommandExecutionResult::Ok
        }
    }
}

#[derive(rustyline_derive::Hinter)]
struct MyHelper {
    commands_names: Vec<String>,
}

impl MyHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        MyHelper { commands_names }
    }
}

impl Completer for MyHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for MyHelper {}
impl Validator for MyHelper {}
impl Helper for MyHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let db_path = cli_args.path.display().to_string();
    let user_store = SqliteUserStore::new(
        &cli_args.path,
        Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
    )
    .with_context(|| format!("Could not open user database at {}", db_path))?;
    let user_manager = UserManager::new(Arc::new(user_store));

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<MyHelper, FileHistory>::with_config(config)?;

    let helper = MyHelper::new();
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(PROMPT);

        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &user_manager, &db_path) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        print_error(&err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
