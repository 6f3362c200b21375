//! Terminal front-end for the banter chat client. Pure rendering glue: it
//! reads snapshots, prints them, and forwards typed lines into the session.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use banter_client::{ClientConfig, Session};
use banter_core::{ConnectionState, SessionSnapshot};
use banter_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "banter", about = "Real-time WebSocket chat client")]
struct Cli {
    /// WebSocket endpoint of the chat server.
    #[arg(long, default_value = "ws://localhost:3000")]
    url: String,

    /// Disable the SQLite operational log.
    #[arg(long)]
    no_log_db: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig {
        log_to_sqlite: !cli.no_log_db,
        ..TelemetryConfig::default()
    };
    let _guard = init_telemetry(&telemetry);

    tracing::info!(url = %cli.url, "starting chat session");

    let config = ClientConfig {
        url: cli.url,
        ..ClientConfig::default()
    };
    let session = Session::new(config);
    session.start();

    let mut snapshots = session.subscribe();
    let mut view = View::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                view.render(&snap);
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => session.submit(&text),
                    Ok(None) | Err(_) => break,
                }
            }
        }
    }

    session.stop();
    tracing::info!("shutting down");
}

/// Tracks what has already been printed so each change renders only the
/// delta.
#[derive(Default)]
struct View {
    connection: Option<ConnectionState>,
    last_error: Option<String>,
    rendered: usize,
}

impl View {
    fn render(&mut self, snap: &SessionSnapshot) {
        if self.connection != Some(snap.connection) {
            match snap.connection {
                ConnectionState::Connected => println!("* connected"),
                ConnectionState::Disconnected => println!("* disconnected"),
                ConnectionState::Errored => {}
            }
            self.connection = Some(snap.connection);
        }

        if snap.last_error != self.last_error {
            if let Some(err) = &snap.last_error {
                println!("! {err}");
            }
            self.last_error.clone_from(&snap.last_error);
        }

        // A history replace can shrink the log; reprint from the top.
        if snap.messages.len() < self.rendered {
            self.rendered = 0;
        }
        for message in &snap.messages[self.rendered..] {
            println!("{message}");
        }
        self.rendered = snap.messages.len();
    }
}
