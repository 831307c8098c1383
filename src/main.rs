#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::Error;
use anyhow::Result;
use domain::models::Event;
use domain::models::User;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::application::cli;
use crate::application::commands;
use crate::application::commands::App;
use crate::domain::services::SessionStore;
use crate::infrastructure::api::AuthApi;
use crate::infrastructure::http::Gateway;
use crate::infrastructure::storage::FileTokenStore;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! Chatsim has failed with the following app version and error.\n\nVersion: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

fn build_app() -> Result<(App, mpsc::UnboundedReceiver<Event>)> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let gateway = Arc::new(Gateway::from_config(
        Arc::new(FileTokenStore::default()),
        event_tx,
    )?);

    let session = Arc::new(SessionStore::new(AuthApi::new(gateway.clone())));
    session.subscribe(|authenticated: bool, user: Option<&User>| {
        tracing::debug!(
            authenticated,
            user_id = ?user.map(|e| return e.id),
            "Session changed"
        );
    });

    return Ok((App::new(gateway, session), event_rx));
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let debug_log_dir = env::var("CHATSIM_LOG_DIR").unwrap_or_else(|_| {
        return dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("chatsim")
            .to_string_lossy()
            .to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("chatsim")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let matches = match cli::parse().await {
        Ok(Some(matches)) => matches,
        Ok(None) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    let (app, event_rx) = match build_app() {
        Ok(res) => res,
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    let session = app.session.clone();
    tokio::spawn(async move {
        session.watch(event_rx).await;
    });

    let mut code = 0;
    if let Err(err) = app.run(&matches).await {
        commands::print_failure(&err);
        code = 1;
    }

    // Flushes pending log lines, which `process::exit` would skip.
    drop(guard);
    process::exit(code);
}
