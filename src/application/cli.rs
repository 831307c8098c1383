use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::MessageRole;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

/// Matches of the invoked command and every nested subcommand, outermost first.
pub fn matches_chain(matches: &ArgMatches) -> Vec<&ArgMatches> {
    let mut chain = vec![matches];
    let mut current = matches;
    while let Some((_, sub_matches)) = current.subcommand() {
        chain.push(sub_matches);
        current = sub_matches;
    }
    return chain;
}

fn arg_chat_id() -> Arg {
    return Arg::new("chat-id")
        .help("ID of the chat.")
        .value_parser(value_parser!(uuid::Uuid))
        .required(true);
}

fn arg_message_id() -> Arg {
    return Arg::new("message-id")
        .help("ID of the message.")
        .value_parser(value_parser!(uuid::Uuid))
        .required(true);
}

fn arg_page() -> Arg {
    return Arg::new("page")
        .long("page")
        .help("Page to show, starting at 1.")
        .value_parser(value_parser!(u32).range(1..))
        .default_value("1");
}

fn arg_yes() -> Arg {
    return Arg::new("yes")
        .short('y')
        .long("yes")
        .help("Skip the confirmation prompt.")
        .action(ArgAction::SetTrue);
}

fn arg_client_description() -> Arg {
    return Arg::new("client-description")
        .long("client-description")
        .num_args(1)
        .help("Who the simulated client is, used by the AI when drafting replies.");
}

fn arg_special_instructions() -> Arg {
    return Arg::new("special-instructions")
        .long("special-instructions")
        .num_args(1)
        .help("Extra instructions the AI follows when drafting replies.");
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_login() -> Command {
    return Command::new("login")
        .about("Sign in. Missing credentials are prompted for.")
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .num_args(1)
                .help("Account email."),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .env("CHATSIM_PASSWORD")
                .hide_env_values(true)
                .num_args(1)
                .help("Account password."),
        );
}

fn subcommand_register() -> Command {
    return subcommand_login()
        .name("register")
        .about("Create an account and company, then sign in. Missing details are prompted for.")
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .num_args(1)
                .help("Your display name."),
        )
        .arg(
            Arg::new("company")
                .long("company")
                .num_args(1)
                .help("Name of the company to create."),
        );
}

fn subcommand_chats() -> Command {
    return Command::new("chats")
        .about("Manage simulated chats.")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List your chats, newest first.")
                .arg(arg_page()),
        )
        .subcommand(
            Command::new("create")
                .about("Start a new chat. Descriptions are stored as the chat's AI configuration.")
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .num_args(1)
                        .help("Chat name. Prompted for when missing."),
                )
                .arg(arg_client_description())
                .arg(arg_special_instructions()),
        )
        .subcommand(
            Command::new("show")
                .about("Show a chat with its messages.")
                .arg(arg_chat_id())
                .arg(
                    Arg::new("transcript")
                        .long("transcript")
                        .help("Print the messages in the import format.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-messages")
                        .long("no-messages")
                        .help("Print only the chat details.")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("transcript"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Change a chat's name or descriptions.")
                .arg(arg_chat_id())
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .num_args(1)
                        .help("New chat name."),
                )
                .arg(arg_client_description())
                .arg(arg_special_instructions()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a chat and all of its messages.")
                .arg(arg_chat_id())
                .arg(arg_yes()),
        );
}

fn subcommand_messages() -> Command {
    return Command::new("messages")
        .about("Read and write the messages of a chat.")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List the messages of a chat.")
                .arg(arg_chat_id())
                .arg(arg_page()),
        )
        .subcommand(
            Command::new("send")
                .about("Add a message to a chat, as the client or as the manager.")
                .arg(arg_chat_id())
                .arg(
                    Arg::new("role")
                        .short('r')
                        .long("role")
                        .help("Who is speaking.")
                        .value_parser(PossibleValuesParser::new(MessageRole::VARIANTS))
                        .default_value("client"),
                )
                .arg(
                    Arg::new("content")
                        .short('m')
                        .long("content")
                        .num_args(1)
                        .help("Message text. Prompted for when missing."),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Replace the text of a message.")
                .arg(arg_message_id())
                .arg(
                    Arg::new("content")
                        .short('m')
                        .long("content")
                        .num_args(1)
                        .help("New message text. Prompted for when missing."),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a message.")
                .arg(arg_message_id())
                .arg(arg_yes()),
        )
        .subcommand(
            Command::new("generate")
                .about("Let the AI draft the next manager reply.")
                .arg(arg_chat_id()),
        )
        .subcommand(
            Command::new("revise")
                .about("Ask the AI to rewrite a message.")
                .arg(arg_message_id())
                .arg(
                    Arg::new("instructions")
                        .short('i')
                        .long("instructions")
                        .num_args(1)
                        .help("How the message should change. Prompted for when missing."),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Import a transcript of CLIENT: and MANAGER: lines. Reads stdin when no file is given.")
                .arg(arg_chat_id())
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .num_args(1)
                        .help("Transcript file to read."),
                ),
        );
}

fn subcommand_ai_config() -> Command {
    let arg_chat = Arg::new("chat")
        .long("chat")
        .help("Chat ID. Omit to use the company-wide configuration.")
        .value_parser(value_parser!(uuid::Uuid));

    return Command::new("ai-config")
        .about("Manage the prompts the AI uses when drafting replies.")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("show")
                .about("Show the configuration.")
                .arg(arg_chat.clone()),
        )
        .subcommand(
            Command::new("set")
                .about("Save the configuration.")
                .arg(arg_chat.clone())
                .arg(arg_client_description())
                .arg(arg_special_instructions()),
        )
        .subcommand(
            Command::new("delete")
                .about("Remove the configuration.")
                .arg(arg_chat)
                .arg(arg_yes()),
        );
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("chatsim")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(subcommand_login())
        .subcommand(subcommand_register())
        .subcommand(Command::new("logout").about("Sign out and forget the stored session."))
        .subcommand(Command::new("whoami").about("Show the signed-in user."))
        .subcommand(subcommand_chats())
        .subcommand(subcommand_messages())
        .subcommand(subcommand_ai_config())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .arg(
            Arg::new(ConfigKey::ApiUrl.to_string())
                .short('u')
                .long(ConfigKey::ApiUrl.to_string())
                .env("CHATSIM_API_URL")
                .num_args(1)
                .help(format!("Base URL of the chat simulator API. [default: {}]", Config::default(ConfigKey::ApiUrl)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("CHATSIM_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::TokenFile.to_string())
                .long(ConfigKey::TokenFile.to_string())
                .env("CHATSIM_TOKEN_FILE")
                .num_args(1)
                .help(format!("File the signed-in session is stored in. [default: {}]", Config::default(ConfigKey::TokenFile)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RequestTimeout.to_string())
                .long(ConfigKey::RequestTimeout.to_string())
                .env("CHATSIM_REQUEST_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before a request to the API times out. [default: {}]", Config::default(ConfigKey::RequestTimeout)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::PageSize.to_string())
                .long(ConfigKey::PageSize.to_string())
                .env("CHATSIM_PAGE_SIZE")
                .num_args(1)
                .help(format!("Number of chats shown per page. [default: {}]", Config::default(ConfigKey::PageSize)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::MessagePageSize.to_string())
                .long(ConfigKey::MessagePageSize.to_string())
                .env("CHATSIM_MESSAGE_PAGE_SIZE")
                .num_args(1)
                .help(format!("Number of messages shown per page. [default: {}]", Config::default(ConfigKey::MessagePageSize)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ContextMessages.to_string())
                .long(ConfigKey::ContextMessages.to_string())
                .env("CHATSIM_CONTEXT_MESSAGES")
                .num_args(1)
                .help(format!("Number of recent messages the AI reads when drafting a reply. [default: {}]", Config::default(ConfigKey::ContextMessages)))
                .global(true),
        );
}

/// Handles the commands that need no API access. Returns the matches of any
/// other command, with configuration loaded.
pub async fn parse() -> Result<Option<ArgMatches>> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(None);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(None);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(None);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(None);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(None);
            }
        },
        _ => {
            Config::load(build(), matches_chain(&matches)).await?;
        }
    }

    return Ok(Some(matches));
}
