#[cfg(test)]
#[path = "commands_test.rs"]
mod tests;

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use dialoguer::Input;
use dialoguer::Password;
use tokio::fs;
use tokio::io::AsyncReadExt;
use uuid::Uuid;
use yansi::Paint;

use super::format;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AiConfig;
use crate::domain::models::Chat;
use crate::domain::models::ChatUpdate;
use crate::domain::models::MessageRole;
use crate::domain::services::transcript;
use crate::domain::services::AuthError;
use crate::domain::services::SessionStore;
use crate::infrastructure::api::AiConfigApi;
use crate::infrastructure::api::ChatsApi;
use crate::infrastructure::api::MessagesApi;
use crate::infrastructure::http::ApiError;
use crate::infrastructure::http::Gateway;

const LINE_WIDTH: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("You are not signed in.")]
    NotSignedIn,

    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl CommandError {
    fn api(fallback: &str) -> impl FnOnce(ApiError) -> CommandError + '_ {
        return move |err| {
            tracing::error!(
                error = ?err,
                status = ?err.status(),
                context = fallback,
                "Command failed"
            );
            return CommandError::Api {
                message: err.detail_or(fallback),
                source: err,
            };
        };
    }

    pub fn is_unauthenticated(&self) -> bool {
        return match self {
            CommandError::NotSignedIn => true,
            CommandError::Api { source, .. } => source.is_unauthorized(),
        };
    }
}

/// Prints a failed command as a single red line, with a sign-in hint when the
/// session is gone.
pub fn print_failure(err: &anyhow::Error) {
    eprintln!("{}", Paint::red(err));
    if needs_sign_in(err) {
        eprintln!("{}", Paint::yellow(SIGN_IN_HINT));
    }
}

const SIGN_IN_HINT: &str = "Run \"chatsim login\" to sign in again.";

fn needs_sign_in(err: &anyhow::Error) -> bool {
    return err
        .downcast_ref::<CommandError>()
        .map(|e| return e.is_unauthenticated())
        .unwrap_or(false);
}

/// Values to save for `ai-config set`. Fields left out keep their saved value.
fn merge_ai_config(
    current: Option<AiConfig>,
    client_description: Option<String>,
    special_instructions: Option<String>,
) -> (String, String) {
    let (saved_description, saved_instructions) = match current {
        Some(config) => (config.client_description, config.special_instructions),
        None => (None, None),
    };

    let client_description = client_description.or(saved_description).unwrap_or_default();
    let special_instructions = special_instructions
        .or(saved_instructions)
        .unwrap_or_default();

    return (
        client_description.trim().to_string(),
        special_instructions.trim().to_string(),
    );
}

fn print_chat_header(chat: &Chat) {
    println!("{}", Paint::new(&chat.name).bold().underline());
    println!("ID: {}", chat.id);
    println!("Created: {}", format::format_timestamp(&chat.created_at));
    if let Some(description) = &chat.client_description {
        println!("Client: {description}");
    }
    if let Some(instructions) = &chat.special_instructions {
        println!("Instructions: {instructions}");
    }
}

fn theme() -> ColorfulTheme {
    return ColorfulTheme::default();
}

fn arg_or_prompt(matches: &ArgMatches, id: &str, prompt: &str) -> Result<String> {
    if let Some(val) = matches.get_one::<String>(id) {
        return Ok(val.to_string());
    }

    let val: String = Input::with_theme(&theme())
        .with_prompt(prompt)
        .interact_text()?;
    return Ok(val);
}

fn password_or_prompt(matches: &ArgMatches, confirm: bool) -> Result<String> {
    if let Some(val) = matches.get_one::<String>("password") {
        return Ok(val.to_string());
    }

    let theme = theme();
    let mut prompt = Password::with_theme(&theme).with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Repeat password", "Passwords do not match");
    }
    return Ok(prompt.interact()?);
}

fn confirmed(matches: &ArgMatches, prompt: &str) -> Result<bool> {
    if matches.get_flag("yes") {
        return Ok(true);
    }

    let res = Confirm::with_theme(&theme())
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    return Ok(res);
}

fn require(val: &str, message: &str) -> Result<String> {
    let trimmed = val.trim();
    if trimmed.is_empty() {
        bail!(message.to_string());
    }
    return Ok(trimmed.to_string());
}

fn id_arg(matches: &ArgMatches, id: &str) -> Result<Uuid> {
    return match matches.get_one::<Uuid>(id) {
        Some(val) => Ok(*val),
        None => bail!(format!("Missing argument <{id}>")),
    };
}

/// Everything a command needs to talk to the API.
pub struct App {
    pub session: Arc<SessionStore>,
    chats: ChatsApi,
    messages: MessagesApi,
    ai_config: AiConfigApi,
}

impl App {
    pub fn new(gateway: Arc<Gateway>, session: Arc<SessionStore>) -> App {
        return App {
            session,
            chats: ChatsApi::new(gateway.clone()),
            messages: MessagesApi::new(gateway.clone()),
            ai_config: AiConfigApi::new(gateway),
        };
    }

    pub async fn run(&self, matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("login", subcmd_matches)) => return self.login(subcmd_matches).await,
            Some(("register", subcmd_matches)) => return self.register(subcmd_matches).await,
            Some(("logout", _)) => {
                self.session.logout().await;
                println!("Signed out.");
                return Ok(());
            }
            Some(("whoami", _)) => return self.whoami().await,
            Some(("chats", subcmd_matches)) => return self.chats(subcmd_matches).await,
            Some(("messages", subcmd_matches)) => return self.messages(subcmd_matches).await,
            Some(("ai-config", subcmd_matches)) => return self.ai_config(subcmd_matches).await,
            _ => return Ok(()),
        }
    }

    async fn login(&self, matches: &ArgMatches) -> Result<()> {
        let email = require(&arg_or_prompt(matches, "email", "Email")?, "Email is required")?;
        let password = password_or_prompt(matches, false)?;

        let user = self.session.login(&email, &password).await?;
        println!("Signed in as {}.", Paint::green(&user.name).bold());
        return Ok(());
    }

    async fn register(&self, matches: &ArgMatches) -> Result<()> {
        let email = require(&arg_or_prompt(matches, "email", "Email")?, "Email is required")?;
        let name = require(&arg_or_prompt(matches, "name", "Your name")?, "Name is required")?;
        let company = require(
            &arg_or_prompt(matches, "company", "Company name")?,
            "Company name is required",
        )?;
        let password = password_or_prompt(matches, true)?;

        match self
            .session
            .register(&email, &password, &name, &company)
            .await
        {
            Ok(user) => {
                println!(
                    "Account created. Signed in as {}.",
                    Paint::green(&user.name).bold()
                );
                return Ok(());
            }
            Err(AuthError::LoginAfterRegistrationFailed) => {
                println!("Account created.");
                bail!(AuthError::LoginAfterRegistrationFailed);
            }
            Err(err) => bail!(err),
        }
    }

    async fn whoami(&self) -> Result<()> {
        if !self.session.check_auth().await {
            bail!(CommandError::NotSignedIn);
        }

        match self.session.current_user() {
            Some(user) => println!("{}", format::format_user(&user)),
            None => bail!(CommandError::NotSignedIn),
        }
        return Ok(());
    }

    async fn chats(&self, matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("list", subcmd_matches)) => {
                let page = subcmd_matches.get_one::<u32>("page").copied().unwrap_or(1);
                let res = self
                    .chats
                    .list(page, Config::get_number(ConfigKey::PageSize))
                    .await
                    .map_err(CommandError::api("Failed to load chats"))?;

                if res.chats.is_empty() {
                    println!("There are no chats yet. You should start your first one!");
                    return Ok(());
                }

                let lines = res
                    .chats
                    .iter()
                    .map(format::format_chat)
                    .collect::<Vec<String>>();
                println!("{}", lines.join("\n"));
                println!(
                    "\n{}",
                    format::format_page(res.page, res.total_pages, res.total_count)
                );
            }
            Some(("create", subcmd_matches)) => {
                let name = require(
                    &arg_or_prompt(subcmd_matches, "name", "Chat name")?,
                    "Chat name cannot be empty",
                )?;
                let client_description = subcmd_matches
                    .get_one::<String>("client-description")
                    .map(|e| return e.trim().to_string())
                    .unwrap_or_default();
                let special_instructions = subcmd_matches
                    .get_one::<String>("special-instructions")
                    .map(|e| return e.trim().to_string())
                    .unwrap_or_default();

                let chat = self
                    .chats
                    .create(&name, &client_description, &special_instructions)
                    .await
                    .map_err(CommandError::api("Failed to create chat"))?;
                println!("Created chat {} ({})", Paint::green(&chat.name).bold(), chat.id);
            }
            Some(("show", subcmd_matches)) => {
                let chat_id = id_arg(subcmd_matches, "chat-id")?;
                if subcmd_matches.get_flag("no-messages") {
                    let chat = self
                        .chats
                        .get(chat_id)
                        .await
                        .map_err(CommandError::api("Failed to load chat"))?;
                    print_chat_header(&chat);
                    return Ok(());
                }

                let res = self
                    .chats
                    .get_with_messages(chat_id)
                    .await
                    .map_err(CommandError::api("Failed to load chat"))?;

                if subcmd_matches.get_flag("transcript") {
                    println!("{}", transcript::render(&res.messages));
                    return Ok(());
                }

                print_chat_header(&res.chat);
                if res.messages.is_empty() {
                    println!("\nNo messages yet.");
                }
                for message in res.messages.iter() {
                    println!("\n{}", format::format_message(message, LINE_WIDTH));
                }
            }
            Some(("update", subcmd_matches)) => {
                let chat_id = id_arg(subcmd_matches, "chat-id")?;
                let update = ChatUpdate {
                    name: subcmd_matches.get_one::<String>("name").cloned(),
                    client_description: subcmd_matches
                        .get_one::<String>("client-description")
                        .cloned(),
                    special_instructions: subcmd_matches
                        .get_one::<String>("special-instructions")
                        .cloned(),
                };
                if update.is_empty() {
                    bail!("Nothing to update. Pass at least one field to change.");
                }
                if let Some(name) = &update.name {
                    require(name, "Chat name cannot be empty")?;
                }

                let chat = self
                    .chats
                    .update(chat_id, &update)
                    .await
                    .map_err(CommandError::api("Failed to update chat"))?;
                println!("Updated chat {}", Paint::green(&chat.name).bold());
            }
            Some(("delete", subcmd_matches)) => {
                let chat_id = id_arg(subcmd_matches, "chat-id")?;
                if !confirmed(subcmd_matches, "Are you sure you want to delete this chat?")? {
                    return Ok(());
                }

                self.chats
                    .delete(chat_id)
                    .await
                    .map_err(CommandError::api("Failed to delete chat"))?;
                println!("Deleted chat {chat_id}");
            }
            _ => {}
        }

        return Ok(());
    }

    async fn messages(&self, matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("list", subcmd_matches)) => {
                let chat_id = id_arg(subcmd_matches, "chat-id")?;
                let page = subcmd_matches.get_one::<u32>("page").copied().unwrap_or(1);
                let res = self
                    .chats
                    .messages(chat_id, page, Config::get_number(ConfigKey::MessagePageSize))
                    .await
                    .map_err(CommandError::api("Failed to load messages"))?;

                if res.messages.is_empty() {
                    println!("No messages yet.");
                    return Ok(());
                }

                let lines = res
                    .messages
                    .iter()
                    .map(|e| return format::format_message(e, LINE_WIDTH))
                    .collect::<Vec<String>>();
                println!("{}", lines.join("\n\n"));
                println!(
                    "\n{}",
                    format::format_page(res.page, res.total_pages, res.total_count)
                );
            }
            Some(("send", subcmd_matches)) => {
                let chat_id = id_arg(subcmd_matches, "chat-id")?;
                let role = subcmd_matches
                    .get_one::<String>("role")
                    .and_then(|e| return MessageRole::parse(e))
                    .unwrap_or(MessageRole::Client);
                let content = require(
                    &arg_or_prompt(subcmd_matches, "content", "Message")?,
                    "Message content cannot be empty",
                )?;

                let message = self
                    .messages
                    .create(chat_id, &content, role)
                    .await
                    .map_err(CommandError::api("Failed to send message"))?;
                println!("{}", format::format_message(&message, LINE_WIDTH));
            }
            Some(("edit", subcmd_matches)) => {
                let message_id = id_arg(subcmd_matches, "message-id")?;
                let content = require(
                    &arg_or_prompt(subcmd_matches, "content", "New text")?,
                    "Message content cannot be empty",
                )?;

                let message = self
                    .messages
                    .update(message_id, &content)
                    .await
                    .map_err(CommandError::api("Failed to update message"))?;
                println!("{}", format::format_message(&message, LINE_WIDTH));
            }
            Some(("delete", subcmd_matches)) => {
                let message_id = id_arg(subcmd_matches, "message-id")?;
                if !confirmed(
                    subcmd_matches,
                    "Are you sure you want to delete this message?",
                )? {
                    return Ok(());
                }

                self.messages
                    .delete(message_id)
                    .await
                    .map_err(CommandError::api("Failed to delete message"))?;
                println!("Deleted message {message_id}");
            }
            Some(("generate", subcmd_matches)) => {
                let chat_id = id_arg(subcmd_matches, "chat-id")?;
                let message = self
                    .messages
                    .generate_ai_response(chat_id, Config::get_number(ConfigKey::ContextMessages))
                    .await
                    .map_err(CommandError::api("Failed to generate AI response"))?;
                println!("{}", format::format_message(&message, LINE_WIDTH));
            }
            Some(("revise", subcmd_matches)) => {
                let message_id = id_arg(subcmd_matches, "message-id")?;
                let instructions = require(
                    &arg_or_prompt(subcmd_matches, "instructions", "How should it change?")?,
                    "Please provide revision instructions",
                )?;

                let message = self
                    .messages
                    .revise_with_ai(message_id, &instructions)
                    .await
                    .map_err(CommandError::api("Failed to revise message with AI"))?;
                println!("{}", format::format_message(&message, LINE_WIDTH));
            }
            Some(("import", subcmd_matches)) => {
                let chat_id = id_arg(subcmd_matches, "chat-id")?;
                let text = match subcmd_matches.get_one::<String>("file") {
                    Some(file) => fs::read_to_string(file).await?,
                    None => read_stdin().await?,
                };
                let messages = transcript::parse_for_import(&text)?;

                let res = self
                    .messages
                    .import(chat_id, &messages)
                    .await
                    .map_err(CommandError::api("Failed to import messages"))?;
                println!("Imported {} messages.", res.len());
            }
            _ => {}
        }

        return Ok(());
    }

    async fn ai_config(&self, matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("show", subcmd_matches)) => {
                let chat_id = subcmd_matches.get_one::<Uuid>("chat").copied();
                let res = match chat_id {
                    Some(chat_id) => self.ai_config.for_chat(chat_id).await,
                    None => self.ai_config.global().await,
                };
                let config = res.map_err(CommandError::api("Failed to load AI configuration"))?;
                println!("{}", format::format_ai_config(config.as_ref()));
            }
            Some(("set", subcmd_matches)) => {
                let chat_id = subcmd_matches.get_one::<Uuid>("chat").copied();
                let mut client_description =
                    subcmd_matches.get_one::<String>("client-description").cloned();
                let mut special_instructions =
                    subcmd_matches.get_one::<String>("special-instructions").cloned();

                if client_description.is_none() && special_instructions.is_none() {
                    let theme = theme();
                    client_description = Some(
                        Input::with_theme(&theme)
                            .with_prompt("Client description")
                            .allow_empty(true)
                            .interact_text()?,
                    );
                    special_instructions = Some(
                        Input::with_theme(&theme)
                            .with_prompt("Special instructions")
                            .allow_empty(true)
                            .interact_text()?,
                    );
                }

                let mut current = None;
                if client_description.is_none() || special_instructions.is_none() {
                    current = self
                        .ai_config
                        .get(chat_id)
                        .await
                        .map_err(CommandError::api("Failed to load AI configuration"))?;
                }
                let (client_description, special_instructions) =
                    merge_ai_config(current, client_description, special_instructions);

                let config = self
                    .ai_config
                    .update(chat_id, &client_description, &special_instructions)
                    .await
                    .map_err(CommandError::api("Failed to update AI configuration"))?;
                println!("{}", format::format_ai_config(Some(&config)));
            }
            Some(("delete", subcmd_matches)) => {
                let chat_id = subcmd_matches.get_one::<Uuid>("chat").copied();
                if !confirmed(
                    subcmd_matches,
                    "Are you sure you want to delete this AI configuration?",
                )? {
                    return Ok(());
                }

                let res = match chat_id {
                    Some(chat_id) => self.ai_config.delete_chat(chat_id).await,
                    None => self.ai_config.delete_global().await,
                };
                res.map_err(CommandError::api("Failed to delete AI configuration"))?;
                println!("Deleted AI configuration.");
            }
            _ => {}
        }

        return Ok(());
    }
}

async fn read_stdin() -> Result<String> {
    if std::io::stdin().is_terminal() {
        eprintln!("Paste the transcript, then press Ctrl-D.");
    }

    let mut text = String::new();
    tokio::io::stdin().read_to_string(&mut text).await?;
    return Ok(text);
}
