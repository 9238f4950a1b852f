//! Language Server Protocol surface for ddevstan.
//!
//! Exposes PHPStan-in-DDEV analysis to any LSP-capable editor. Built into
//! the main binary and started with `ddevstan server`.

pub mod server;

pub use server::DdevstanLanguageServer;

use anyhow::Result;
use tokio::net::TcpListener;
use tower_lsp::{LspService, Server};

/// Start the LSP server over stdio. This is the entry point for
/// `ddevstan server`.
pub async fn start_server() -> Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(DdevstanLanguageServer::new);

    log::info!("starting ddevstan language server on stdio");

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

/// Start the LSP server over TCP (useful for debugging).
pub async fn start_tcp_server(port: u16) -> Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    log::info!("ddevstan language server listening on 127.0.0.1:{port}");

    loop {
        let (stream, _) = listener.accept().await?;
        let (service, socket) = LspService::new(DdevstanLanguageServer::new);

        tokio::spawn(async move {
            let (read, write) = tokio::io::split(stream);
            Server::new(read, write, socket).serve(service).await;
        });
    }
}
