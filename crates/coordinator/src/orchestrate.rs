//! Top-level sequencing: fork every endpoint's children up front, drop the
//! coordinator's own filesystem access, then walk each endpoint's handshake.

use crate::children::{postexec, rotator, syncer};
use crate::process::{reap, spawn_child, Child, ProcessError};
use crate::provisioning::{provision, ProvisionError};
use config::ResolvedEndpoint;
use ipc::{read_command, write_command, write_custom, Command, IpcError};
use std::path::Path;

/// Directory the coordinator chroots itself into once every endpoint's
/// children have been forked. Matches the original's `EMPTYDIR`: it holds
/// no files and exists solely so the parent process cannot read or write
/// anything for the rest of its run.
const EMPTY_DIR: &str = "/var/empty";

/// Options that apply uniformly to every endpoint in a run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Mirrors `-f`: run a backup even if the shortest interval's first
    /// slot has not yet expired.
    pub force: bool,
    /// Net verbosity, forwarded to the syncer's rsync invocation.
    pub verbosity: i32,
}

/// Errors produced while orchestrating one endpoint's backup pass.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrateError {
    /// Provisioning the endpoint's root/local directories failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// Forking or reaping a child process failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Writing or reading a command over a child's channel failed.
    #[error(transparent)]
    Ipc(#[from] IpcError),
}

/// One endpoint's forked-but-not-yet-run children.
struct SpawnedEndpoint {
    endpoint: snapmodel::Endpoint,
    postexec_child: Option<Child>,
    rotator_child: Child,
    syncer_child: Child,
}

/// Fork every endpoint's children, chroot the coordinator itself into an
/// empty directory, then drive each endpoint's handshake in turn. Returns
/// `true` if every endpoint completed without error (a rotator reporting
/// "not due yet" still counts as success).
///
/// This mirrors `main()`'s structure: all forking happens before the
/// coordinator gives up its own filesystem access, and only after that does
/// it start signalling children to run.
pub fn run_all(endpoints: &[ResolvedEndpoint], opts: RunOptions) -> bool {
    let mut spawned = Vec::with_capacity(endpoints.len());
    let mut all_ok = true;

    for resolved in endpoints {
        match spawn_endpoint(resolved, opts) {
            Ok(s) => spawned.push(s),
            Err(error) => {
                tracing::error!(id = resolved.endpoint.id(), %error, "endpoint failed to start");
                all_ok = false;
            }
        }
    }

    if let Err(error) = chroot_into(Path::new(EMPTY_DIR)) {
        tracing::error!(%error, dir = EMPTY_DIR, "coordinator: chroot failed");
        return false;
    }

    for endpoint in spawned {
        if let Err(error) = wait_endpoint(endpoint) {
            tracing::error!(%error, "endpoint failed");
            all_ok = false;
        }
    }

    all_ok
}

/// Provision one endpoint's directories and fork its postexec (if
/// configured), rotator, and syncer children, in that order.
fn spawn_endpoint(resolved: &ResolvedEndpoint, opts: RunOptions) -> Result<SpawnedEndpoint, OrchestrateError> {
    let local_path = provision(resolved)?;
    let endpoint = resolved.endpoint.clone();

    let postexec_child = if endpoint.postexec().is_some() {
        let endpoint = endpoint.clone();
        let path = local_path.clone();
        Some(spawn_child(move |channel| {
            let code = postexec::run(&endpoint, &path, channel);
            std::process::exit(code);
        })?)
    } else {
        None
    };

    let rotator_child = {
        let endpoint = endpoint.clone();
        let path = local_path.clone();
        let force = opts.force;
        spawn_child(move |channel| {
            if let Err(error) = chroot_into(&path) {
                tracing::error!(%error, path = %path.display(), "rotator: chroot failed");
                std::process::exit(1);
            }
            let code = rotator::run(&endpoint, channel, force);
            std::process::exit(code);
        })?
    };

    let syncer_child = {
        let endpoint = endpoint.clone();
        let path = local_path.clone();
        let verbosity = opts.verbosity;
        spawn_child(move |channel| {
            let code = syncer::run(&endpoint, &path, channel, verbosity);
            std::process::exit(code);
        })?
    };

    Ok(SpawnedEndpoint {
        endpoint,
        postexec_child,
        rotator_child,
        syncer_child,
    })
}

/// Drive one already-forked endpoint through its rotator/syncer/postexec
/// handshake.
///
/// The rotator either reports `CMDREADY` (there is a fresh sync area worth
/// trying) or `CMDCLOSED` (nothing to do this round, every other child is
/// just told to stop).
fn wait_endpoint(mut spawned: SpawnedEndpoint) -> Result<(), OrchestrateError> {
    let endpoint = &spawned.endpoint;
    let mut postexec_child = spawned.postexec_child.take();
    let rotator_child = spawned.rotator_child;
    let syncer_child = spawned.syncer_child;

    let mut rotator_channel = rotator_child.channel;
    let mut syncer_channel = syncer_child.channel;

    write_command(&mut rotator_channel, Command::Start)?;
    let decision = read_command(&mut rotator_channel)?;

    if matches!(decision, Command::Ready) {
        write_command(&mut syncer_channel, Command::Start)?;
        let mut status = reap(syncer_child.pid)?;

        if let Some(child) = postexec_child.as_mut() {
            write_custom(&mut child.channel, status)?;
            status = reap(child.pid)?;
        } else if !endpoint.rsync_accept_exit_codes().is_empty()
            && endpoint.rsync_accept_exit_codes().contains(&status)
        {
            status = 0;
        }

        if status != 0 {
            tracing::warn!(id = endpoint.id(), status, "sync did not complete successfully");
        }

        let next = if status == 0 {
            Command::RotInclude
        } else {
            Command::RotCleanup
        };
        write_command(&mut rotator_channel, next)?;
    } else {
        write_command(&mut syncer_channel, Command::Stop)?;
        reap(syncer_child.pid)?;
        if let Some(mut child) = postexec_child {
            write_command(&mut child.channel, Command::Stop)?;
            reap(child.pid)?;
        }
    }

    let rotator_status = reap(rotator_child.pid)?;
    if rotator_status != 0 {
        tracing::warn!(id = endpoint.id(), rotator_status, "rotator exited nonzero");
    }

    Ok(())
}

fn chroot_into(path: &Path) -> Result<(), nix::Error> {
    nix::unistd::chroot(path)?;
    nix::unistd::chdir("/")?;
    Ok(())
}
