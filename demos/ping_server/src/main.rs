//! Ping Server Demo
//!
//! A small UDP server showing single-handler routes, multi-stage chains,
//! once-listeners and global middleware.
//!
//! # Routes
//!
//! | Route       | Method | Behaviour                                   |
//! |-------------|--------|---------------------------------------------|
//! | `/ping`     | GET    | replies `{"pong": true}`                    |
//! | `/echo`     | POST   | rejects a null body, otherwise echoes it    |
//! | `/hello`    | GET    | answers the first caller only               |
//! | `/shutdown` | POST   | stops the server                            |
//!
//! # Usage
//!
//! ```bash
//! cargo run --package ping-server -- --port 9000
//! echo '{"route":"/ping","headers":{"method":"GET"}}' | nc -u -w1 127.0.0.1 9000
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use courier::prelude::*;
use courier::runtime::CourierConfig;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "ping-server", about = "Courier UDP demo server")]
struct Args {
    /// Configuration file (defaults to courier.toml in the working directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding `server.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind, overriding `server.bind_host`.
    #[arg(short, long)]
    bind: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn ping(_req: Request, res: Response) -> bool {
    res.send(json!({ "pong": true })).await
}

/// Halts the chain when there is nothing to echo.
async fn require_body(req: Request, res: Response, next: Next) {
    if req.body().is_null() {
        if let Ok(res) = res.set_status(400).await {
            res.send(json!({ "error": "Body required" })).await;
        }
        return;
    }
    next.run(req, res).await;
}

async fn echo(req: Request, res: Response) -> bool {
    res.set_headers(json!({ "echoed": true }));
    res.send(req.body().clone()).await
}

async fn hello(req: Request, res: Response) -> bool {
    info!(agent = %req.agent(), "First caller on /hello");
    res.send(json!({ "hello": req.agent().address })).await
}

fn load_config(args: Args) -> Result<CourierConfig> {
    let mut builder = Server::builder();
    if let Some(path) = args.config {
        builder = builder.config_file(path);
    }

    let mut config = builder.load()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind_host = bind;
    }
    Ok(config)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(Args::parse())?;
    let server = Server::builder().config(config).build_udp()?;

    server.use_fn("request-log", |req, _res| {
        info!(route = req.route(), method = ?req.method(), from = %req.agent(), "Request");
        MiddlewareOutcome::Continue
    });

    server.on("/ping", "GET", ping);
    server.on_chain("/echo", "POST", chain![require_body, echo]);
    server.once("/hello", "GET", hello);

    let handle = server.handle();
    server.on("/shutdown", "POST", move |_req: Request, res: Response| {
        let handle = handle.clone();
        async move {
            res.send(json!({ "stopping": true })).await;
            handle.stop();
        }
    });

    server.handle().stop_on_ctrl_c();
    server.listen_configured().await?;

    Ok(())
}
