//! Plugin bridge, host side.
//!
//! [`PluggableStore`] promotes a store implementation running in a separate
//! OS process to a first-class [`Store`] in this one. The subprocess is
//! spawned from `Options::plugin_address`, must announce itself with the
//! versioned handshake line, and then serves the four store operations as
//! newline-delimited JSON request/response pairs on its stdio.
//!
//! A transport fault (crashed subprocess, malformed response) fails the
//! in-flight call and the whole session. The bridge never restarts a
//! plugin; callers recreate the store instead.

mod wire;

pub use wire::{error_from_wire, error_to_wire};

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use cfile_protocol::ops::{OptionsPayload, RetrieveArgs, UploadArgs, WireFingerprint};
use cfile_protocol::{Handshake, PluginOp, PluginRequest, PluginResponse, PROTOCOL_VERSION};

use crate::cancel::CancelToken;
use crate::fingerprint;
use crate::store::{Options, Store, StoreError};

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Handshake done, stub usable.
    Ready,
    /// A transport fault occurred; every further call fails fast.
    Failed,
    /// Closed by the caller; the subprocess is gone.
    Closed,
}

/// Live subprocess plus its RPC channel.
#[derive(Debug)]
struct PluginSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl PluginSession {
    /// Kill the subprocess and reap it. Errors are ignored; the process may
    /// already be gone.
    fn terminate(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A [`Store`] whose method bodies are RPC calls into a plugin subprocess.
#[derive(Debug)]
pub struct PluggableStore {
    plugin: PathBuf,
    options: Options,
    session: Option<PluginSession>,
    state: SessionState,
}

impl PluggableStore {
    /// Spawn the plugin named by `options.plugin_address`, run the
    /// handshake, and return a ready stub.
    ///
    /// A subprocess announcing the wrong protocol version or magic cookie
    /// is killed before this returns [`StoreError::HandshakeFailed`].
    pub fn connect(options: Options) -> Result<Self, StoreError> {
        let plugin = options
            .plugin_address
            .clone()
            .ok_or_else(|| StoreError::Backend {
                message: "no plugin executable configured (plugin_address is unset)".to_string(),
            })?;

        let mut child = Command::new(&plugin)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| StoreError::SpawnFailed {
                plugin: plugin.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            StoreError::transport("child stdin handle missing after spawn")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            StoreError::transport("child stdout handle missing after spawn")
        })?;

        let mut session = PluginSession {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        if let Err(detail) = negotiate(&mut session) {
            session.terminate();
            return Err(StoreError::HandshakeFailed { plugin, detail });
        }

        Ok(Self {
            plugin,
            options,
            session: Some(session),
            state: SessionState::Ready,
        })
    }

    /// Path of the plugin executable this store drives.
    pub fn plugin_path(&self) -> &PathBuf {
        &self.plugin
    }

    /// The options this stub was constructed with, without a round trip.
    /// [`Store::options`] asks the plugin over the wire instead.
    pub fn bound_options(&self) -> &Options {
        &self.options
    }

    /// Issue one request/response round trip. Any channel fault fails the
    /// session permanently.
    fn call(
        &mut self,
        op: PluginOp,
        payload: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Closed => return Err(StoreError::Closed),
            SessionState::Failed => {
                return Err(StoreError::transport(
                    "plugin session already failed; recreate the store",
                ))
            }
        }
        let session = self.session.as_mut().ok_or(StoreError::Closed)?;

        let request = PluginRequest {
            protocol_version: PROTOCOL_VERSION,
            op,
            request_id: uuid::Uuid::new_v4().to_string(),
            payload,
        };

        let round_trip = (|| -> Result<PluginResponse, StoreError> {
            let line = serde_json::to_string(&request)
                .map_err(|e| StoreError::transport(format!("encode request: {}", e)))?;
            writeln!(session.stdin, "{}", line)
                .map_err(|e| StoreError::transport(format!("write request: {}", e)))?;
            session
                .stdin
                .flush()
                .map_err(|e| StoreError::transport(format!("flush request: {}", e)))?;

            let mut reply = String::new();
            let n = session
                .stdout
                .read_line(&mut reply)
                .map_err(|e| StoreError::transport(format!("read response: {}", e)))?;
            if n == 0 {
                return Err(StoreError::transport(
                    "plugin closed the channel mid-call (process exited?)",
                ));
            }
            serde_json::from_str(&reply)
                .map_err(|e| StoreError::transport(format!("malformed response: {}", e)))
        })();

        let response = match round_trip {
            Ok(response) => response,
            Err(err) => {
                self.fail_session();
                return Err(err);
            }
        };

        if response.request_id != request.request_id {
            self.fail_session();
            return Err(StoreError::transport(format!(
                "response correlates to {:?}, expected {:?}",
                response.request_id, request.request_id
            )));
        }

        if response.ok {
            Ok(response.payload)
        } else {
            // Re-raise the plugin's domain error under its original kind.
            let wire = response.error.unwrap_or_else(|| {
                cfile_protocol::WireError::new(
                    cfile_protocol::ErrorKind::Internal,
                    "plugin reported failure without error details",
                )
            });
            Err(error_from_wire(&wire))
        }
    }

    fn fail_session(&mut self) {
        self.state = SessionState::Failed;
        if let Some(session) = self.session.as_mut() {
            session.terminate();
        }
        self.session = None;
    }
}

impl Store for PluggableStore {
    fn upload(&mut self, ctx: &CancelToken, paths: &[PathBuf]) -> Result<(), StoreError> {
        ctx.check()?;
        let args = UploadArgs {
            paths: paths.iter().map(|p| p.to_string_lossy().into_owned()).collect(),
        };
        let payload = serde_json::to_value(args)
            .map_err(|e| StoreError::transport(format!("encode upload args: {}", e)))?;
        self.call(PluginOp::Upload, payload)?;
        Ok(())
    }

    fn retrieve(&mut self, ctx: &CancelToken, sidecar_paths: &[PathBuf]) -> Result<(), StoreError> {
        ctx.check()?;
        // Parse every record up front: malformed sidecars surface here,
        // client-side, and the parsed map rides along for the plugin.
        let mut args = RetrieveArgs {
            sidecar_paths: Vec::with_capacity(sidecar_paths.len()),
            fingerprints: Default::default(),
        };
        for sidecar in sidecar_paths {
            let record = fingerprint::read_record(sidecar)?.map_err(|e| {
                StoreError::MalformedRecord {
                    path: sidecar.clone(),
                    reason: e.to_string(),
                }
            })?;
            let key = sidecar.to_string_lossy().into_owned();
            args.fingerprints.insert(
                key.clone(),
                WireFingerprint {
                    name: record.name,
                    checksum: record.checksum,
                    date_modified: record.date_modified.to_rfc3339(),
                },
            );
            args.sidecar_paths.push(key);
        }
        let payload = serde_json::to_value(args)
            .map_err(|e| StoreError::transport(format!("encode retrieve args: {}", e)))?;
        self.call(PluginOp::Retrieve, payload)?;
        Ok(())
    }

    fn options(&mut self) -> Result<Options, StoreError> {
        let payload = self.call(PluginOp::Options, serde_json::Value::Null)?;
        let payload = payload
            .ok_or_else(|| StoreError::transport("options response carried no payload"))?;
        let parsed: OptionsPayload = serde_json::from_value(payload)
            .map_err(|e| StoreError::transport(format!("malformed options payload: {}", e)))?;
        Ok(parsed.into())
    }

    /// Terminates the subprocess unconditionally; no graceful shutdown is
    /// negotiated. Idempotent.
    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(mut session) = self.session.take() {
            session.terminate();
        }
        self.state = SessionState::Closed;
        Ok(())
    }
}

impl Drop for PluggableStore {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.terminate();
        }
    }
}

/// Read and validate the handshake line. Returns a human-readable rejection
/// detail on failure; the caller kills the subprocess.
fn negotiate(session: &mut PluginSession) -> Result<(), String> {
    let mut line = String::new();
    let n = session
        .stdout
        .read_line(&mut line)
        .map_err(|e| format!("reading handshake: {}", e))?;
    if n == 0 {
        return Err("plugin exited before announcing a handshake".to_string());
    }

    let announced = Handshake::parse_line(&line)
        .ok_or_else(|| format!("not a handshake line: {:?}", line.trim_end()))?;
    if !announced.matches_current() {
        return Err(format!(
            "announced protocol {} with cookie {:?}, host speaks protocol {}",
            announced.protocol_version, announced.cookie, PROTOCOL_VERSION
        ));
    }
    Ok(())
}
