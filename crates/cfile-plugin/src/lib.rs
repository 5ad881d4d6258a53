//! Plugin-side harness.
//!
//! Wraps a concrete [`Store`] and serves it over the plugin wire protocol:
//! one handshake line on stdout, then one JSON response line per JSON
//! request line on stdin. Domain errors are lowered onto the wire with
//! their kind tags so the host re-raises them unchanged.
//!
//! A plugin binary is a `main` that builds its store and calls [`serve`].

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use cfile::fingerprint::is_valid_checksum;
use cfile::plugin::error_to_wire;
use cfile::{CancelToken, Store, StoreError};
use cfile_protocol::ops::{OptionsPayload, RetrieveArgs, UploadArgs};
use cfile_protocol::{
    ErrorKind, Handshake, PluginOp, PluginRequest, PluginResponse, WireError, PROTOCOL_VERSION,
};

/// Serve `store` on this process's stdin/stdout until the host closes the
/// channel or sends a `close` op.
pub fn serve<S: Store>(store: S) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_with_io(store, &mut stdin.lock(), &mut stdout.lock())
}

/// Serve with caller-provided channels, for testing.
pub fn serve_with_io<S: Store, R: BufRead, W: Write>(
    mut store: S,
    reader: &mut R,
    writer: &mut W,
) -> io::Result<()> {
    writeln!(writer, "{}", Handshake::current().to_line())?;
    writer.flush()?;

    let ctx = CancelToken::new();
    let mut line = String::new();
    let mut closed = false;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            // Host hung up; tear down without a response.
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let request: PluginRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                let response = PluginResponse::failure(
                    PROTOCOL_VERSION,
                    String::new(),
                    WireError::new(ErrorKind::Internal, format!("unparseable request: {}", e)),
                );
                write_response(writer, &response)?;
                continue;
            }
        };

        let response = if request.protocol_version != PROTOCOL_VERSION {
            PluginResponse::failure(
                PROTOCOL_VERSION,
                request.request_id.clone(),
                WireError::new(
                    ErrorKind::Internal,
                    format!(
                        "unsupported protocol version {}, this plugin speaks {}",
                        request.protocol_version, PROTOCOL_VERSION
                    ),
                ),
            )
        } else {
            let (done, response) = dispatch(&mut store, &ctx, &request);
            closed = done;
            response
        };

        write_response(writer, &response)?;
        if closed {
            break;
        }
    }

    if !closed {
        store
            .close()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    }
    Ok(())
}

/// Dispatch one request to the wrapped store. The bool is true when the
/// host asked to close and the loop should end after responding.
fn dispatch<S: Store>(
    store: &mut S,
    ctx: &CancelToken,
    request: &PluginRequest,
) -> (bool, PluginResponse) {
    let id = request.request_id.clone();
    match request.op {
        PluginOp::Upload => {
            let result = parse_payload::<UploadArgs>(&request.payload).and_then(|args| {
                let paths: Vec<PathBuf> = args.paths.iter().map(PathBuf::from).collect();
                store.upload(ctx, &paths)
            });
            (false, ack_or_failure(id, result))
        }
        PluginOp::Retrieve => {
            let result = parse_payload::<RetrieveArgs>(&request.payload).and_then(|args| {
                // Cross-check the records the host sent before touching the
                // backend; a mangled map means the call itself is suspect.
                for (sidecar, fp) in &args.fingerprints {
                    if !is_valid_checksum(&fp.checksum) {
                        return Err(StoreError::MalformedRecord {
                            path: PathBuf::from(sidecar),
                            reason: format!("checksum {:?} is not 64 lowercase hex chars", fp.checksum),
                        });
                    }
                }
                let paths: Vec<PathBuf> = args.sidecar_paths.iter().map(PathBuf::from).collect();
                store.retrieve(ctx, &paths)
            });
            (false, ack_or_failure(id, result))
        }
        PluginOp::Options => match store.options() {
            Ok(options) => {
                let payload = OptionsPayload::from(&options);
                match serde_json::to_value(payload) {
                    Ok(value) => (false, PluginResponse::success(PROTOCOL_VERSION, id, value)),
                    Err(e) => (
                        false,
                        PluginResponse::failure(
                            PROTOCOL_VERSION,
                            id,
                            WireError::new(
                                ErrorKind::Internal,
                                format!("encode options payload: {}", e),
                            ),
                        ),
                    ),
                }
            }
            Err(err) => (
                false,
                PluginResponse::failure(PROTOCOL_VERSION, id, error_to_wire(&err)),
            ),
        },
        PluginOp::Close => (true, ack_or_failure(id, store.close())),
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(
    payload: &serde_json::Value,
) -> Result<T, StoreError> {
    serde_json::from_value(payload.clone()).map_err(|e| StoreError::Backend {
        message: format!("invalid request payload: {}", e),
    })
}

fn ack_or_failure(request_id: String, result: Result<(), StoreError>) -> PluginResponse {
    match result {
        Ok(()) => PluginResponse::ack(PROTOCOL_VERSION, request_id),
        Err(err) => PluginResponse::failure(PROTOCOL_VERSION, request_id, error_to_wire(&err)),
    }
}

fn write_response<W: Write>(writer: &mut W, response: &PluginResponse) -> io::Result<()> {
    let line = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    writeln!(writer, "{}", line)?;
    writer.flush()
}
