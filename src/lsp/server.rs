//! LSP server main loop using lsp-server.

use super::capabilities::server_capabilities;
use super::handlers::{
    handle_execute_command, handle_hover, handle_inlay_hints, CommandError, ServerState,
};
use super::workspace::ServerConfig;
use anyhow::Result;
use lsp_server::{
    Connection, ErrorCode, ExtractError, Message, Notification, Request, RequestId, Response,
};
use lsp_types::{
    notification::{DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument},
    request::{ExecuteCommand, HoverRequest, InlayHintRequest},
    ClientCapabilities, InitializeParams,
};
use std::time::Instant;

/// Run the LSP server.
pub fn run_server() -> Result<()> {
    tracing::info!("Starting eval-overlay LSP server...");

    // Create the transport. Uses stdin/stdout for communication.
    let (connection, io_threads) = Connection::stdio();

    let server_capabilities = serde_json::to_value(server_capabilities())?;

    let initialization_params = match connection.initialize(server_capabilities) {
        Ok(params) => params,
        Err(e) => {
            if e.channel_is_disconnected() {
                io_threads.join()?;
            }
            return Err(e.into());
        }
    };

    let params: InitializeParams = serde_json::from_value(initialization_params)?;
    let config = server_config(params.initialization_options);
    let state = ServerState::new(config)
        .with_inlay_hint_refresh(supports_inlay_hint_refresh(&params.capabilities));
    tracing::info!("Server initialized");

    main_loop(connection, state)?;

    io_threads.join()?;
    tracing::info!("Server shutdown complete");

    Ok(())
}

fn server_config(options: Option<serde_json::Value>) -> ServerConfig {
    let Some(options) = options else {
        return ServerConfig::default();
    };
    serde_json::from_value(options).unwrap_or_else(|e| {
        tracing::warn!("Ignoring invalid initializationOptions: {}", e);
        ServerConfig::default()
    })
}

fn supports_inlay_hint_refresh(capabilities: &ClientCapabilities) -> bool {
    capabilities
        .workspace
        .as_ref()
        .and_then(|workspace| workspace.inlay_hint.as_ref())
        .and_then(|inlay_hint| inlay_hint.refresh_support)
        .unwrap_or(false)
}

fn main_loop(connection: Connection, mut state: ServerState) -> Result<()> {
    loop {
        // Wake up for the next annotation expiry even when the client is idle.
        let msg = match state.next_deadline() {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match connection.receiver.recv_timeout(timeout) {
                    Ok(msg) => Some(msg),
                    Err(e) if e.is_timeout() => None,
                    Err(_) => break,
                }
            }
            None => match connection.receiver.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };

        match msg {
            Some(Message::Request(req)) => {
                if connection.handle_shutdown(&req)? {
                    return Ok(());
                }
                handle_request(&mut state, &connection, req)?;
            }
            Some(Message::Response(resp)) => {
                // Acknowledgements of our refresh requests
                tracing::trace!("Client response: {:?}", resp.id);
            }
            Some(Message::Notification(not)) => {
                handle_notification(&mut state, not)?;
            }
            None => {}
        }

        state.fire_due_timers(Instant::now());
        for out in state.drain_outbox() {
            connection.sender.send(out)?;
        }
    }

    Ok(())
}

fn handle_request(state: &mut ServerState, connection: &Connection, req: Request) -> Result<()> {
    let req = match cast_request::<ExecuteCommand>(req) {
        Ok((id, params)) => {
            let resp = match handle_execute_command(state, params) {
                Ok(result) => Response::new_ok(id, result),
                Err(e) => command_error_response(id, e),
            };
            connection.sender.send(Message::Response(resp))?;
            return Ok(());
        }
        Err(ExtractError::MethodMismatch(req)) => req,
        Err(e) => return Err(e.into()),
    };

    let req = match cast_request::<InlayHintRequest>(req) {
        Ok((id, params)) => {
            let result = handle_inlay_hints(state, params)?;
            let resp = Response::new_ok(id, result);
            connection.sender.send(Message::Response(resp))?;
            return Ok(());
        }
        Err(ExtractError::MethodMismatch(req)) => req,
        Err(e) => return Err(e.into()),
    };

    let req = match cast_request::<HoverRequest>(req) {
        Ok((id, params)) => {
            let result = handle_hover(state, params)?;
            let resp = Response::new_ok(id, result);
            connection.sender.send(Message::Response(resp))?;
            return Ok(());
        }
        Err(ExtractError::MethodMismatch(req)) => req,
        Err(e) => return Err(e.into()),
    };

    tracing::warn!("Unhandled request: {:?}", req.method);
    let resp = Response::new_err(
        req.id,
        ErrorCode::MethodNotFound as i32,
        format!("unhandled method {}", req.method),
    );
    connection.sender.send(Message::Response(resp))?;
    Ok(())
}

fn command_error_response(id: RequestId, error: CommandError) -> Response {
    let code = if error.is_invalid_params() {
        ErrorCode::InvalidParams
    } else {
        ErrorCode::RequestFailed
    };
    tracing::warn!("Command failed: {}", error);
    Response::new_err(id, code as i32, error.to_string())
}

fn handle_notification(state: &mut ServerState, not: Notification) -> Result<()> {
    let not = match cast_notification::<DidOpenTextDocument>(not) {
        Ok(params) => {
            tracing::info!("Document opened: {}", params.text_document.uri.as_str());
            state.open_document(params.text_document.uri, params.text_document.text);
            return Ok(());
        }
        Err(ExtractError::MethodMismatch(not)) => not,
        Err(e) => return Err(e.into()),
    };

    let not = match cast_notification::<DidChangeTextDocument>(not) {
        Ok(params) => {
            tracing::debug!("Document changed: {}", params.text_document.uri.as_str());
            state.change_document(&params.text_document.uri, params.content_changes);
            return Ok(());
        }
        Err(ExtractError::MethodMismatch(not)) => not,
        Err(e) => return Err(e.into()),
    };

    let not = match cast_notification::<DidCloseTextDocument>(not) {
        Ok(params) => {
            tracing::info!("Document closed: {}", params.text_document.uri.as_str());
            state.close_document(&params.text_document.uri);
            return Ok(());
        }
        Err(ExtractError::MethodMismatch(not)) => not,
        Err(e) => return Err(e.into()),
    };

    tracing::trace!("Unhandled notification: {:?}", not.method);
    Ok(())
}

fn cast_request<R>(req: Request) -> Result<(RequestId, R::Params), ExtractError<Request>>
where
    R: lsp_types::request::Request,
    R::Params: serde::de::DeserializeOwned,
{
    req.extract(R::METHOD)
}

fn cast_notification<N>(not: Notification) -> Result<N::Params, ExtractError<Notification>>
where
    N: lsp_types::notification::Notification,
    N::Params: serde::de::DeserializeOwned,
{
    not.extract(N::METHOD)
}
