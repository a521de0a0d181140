use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use reviewd::{db, ipc};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reviewd")]
#[command(about = "Project review sidecar: JSON requests on stdin, one JSON response per line on stdout")]
#[command(version)]
struct Args {
    /// Workspace directory to open at start-up.
    #[arg(long, env = "REVIEWD_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Tracing filter directive; logs go to stderr.
    #[arg(long, env = "REVIEWD_LOG", default_value = "reviewd=info")]
    log: String,
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("reviewd=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log);

    let mut state = ipc::AppState::default();
    if let Some(path) = args.workspace {
        match db::open_db(&path) {
            Ok(conn) => {
                tracing::info!(workspace = %path.display(), "workspace opened");
                state.workspace = Some(path);
                state.db = Some(conn);
            }
            Err(e) => tracing::error!(workspace = %path.display(), error = %e, "workspace could not be opened"),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
