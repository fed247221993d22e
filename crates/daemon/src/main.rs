// SPDX-License-Identifier: MIT

//! Dispatcher master (masterd).
//!
//! Two cooperating execution contexts (spec §5): this `main` drives the
//! control-plane/dispatch-sweep/registry context; `run_log_context` owns the
//! log socket and the `JobLogHandle` table on its own task and never touches
//! the registry or control socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use dispatcher_core::{MasterConfig, SystemClock};
use dispatcher_daemon::dispatcher::DispatchConfig;
use dispatcher_daemon::transport::{ControlSocket, LogSocket};
use dispatcher_daemon::{Cli, ControlPlane, Dispatcher, LogIngest, Registry, TransportError};
use dispatcher_store::{InMemoryStore, Store};
use dispatcher_wire::{InboundMsg, LogFrame};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
#[allow(unsafe_code)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // spec §6.1 sentinel file: master and worker roles are mutually exclusive.
    if cli.role_sentinel.exists() {
        eprintln!(
            "[INIT] {} exists: refusing to start, this host is configured as a worker",
            cli.role_sentinel.display()
        );
        std::process::exit(2);
    }

    #[cfg(unix)]
    // SAFETY: umask is process-global and has no preconditions; called once
    // at startup before any file is created, matching dispatcher-master.py's
    // `os.umask(0o022)`.
    unsafe {
        libc::umask(0o022);
    }

    let _log_guard = setup_logging(&cli)?;
    info!("[INIT] masterd has started");
    info!(version = dispatcher_core::PROTOCOL_VERSION, "[INIT] Using protocol version");

    if cli.encryption_enabled() {
        validate_curve_config(&cli)?;
    }

    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let dispatch_config = DispatchConfig {
        env_path: cli.env.clone(),
        env_dut_path: cli.env_dut.clone(),
        dispatchers_config_dir: cli.dispatchers_config.clone(),
    };

    let control_plane = ControlPlane::new(Registry::new(SystemClock));
    let control_socket = ControlSocket::bind(&cli.master_socket).await?;
    let log_socket = LogSocket::bind(&cli.log_socket).await?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let log_task = tokio::spawn(run_log_context(
        log_socket,
        Arc::clone(&store),
        Arc::clone(&shutdown),
    ));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigquit = signal(SignalKind::quit())?;
    let mut sighup = signal(SignalKind::hangup())?;

    run_main_context(control_plane, control_socket, store, dispatch_config, Arc::clone(&shutdown), &mut sigterm, &mut sigint, &mut sigquit, &mut sighup, &cli)
        .await;

    shutdown.store(true, Ordering::SeqCst);
    let _ = log_task.await;
    info!("masterd stopped");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_main_context(
    mut control_plane: ControlPlane<SystemClock>,
    mut control_socket: ControlSocket,
    store: Arc<dyn Store>,
    dispatch_config: DispatchConfig,
    shutdown: Arc<AtomicBool>,
    sigterm: &mut tokio::signal::unix::Signal,
    sigint: &mut tokio::signal::unix::Signal,
    sigquit: &mut tokio::signal::unix::Signal,
    sighup: &mut tokio::signal::unix::Signal,
    cli: &Cli,
) {
    let config = MasterConfig::default();
    // spec §4.4: the sweep runs no more often than every `db_limit`.
    let mut sweep_tick = tokio::time::interval(config.db_limit);

    loop {
        tokio::select! {
            frame = control_socket.recv() => {
                match frame {
                    Ok((hostname, frames)) => {
                        match InboundMsg::decode(&frames) {
                            Ok(msg) => {
                                if let Some(reply) = control_plane.handle(&hostname, msg, store.as_ref()).await {
                                    if let Err(e) = control_socket.send(&hostname, reply.encode()).await {
                                        error!(%hostname, error = %e, "failed to send control reply");
                                    }
                                }
                            }
                            Err(e) => error!(%hostname, error = %e, "malformed control frame"),
                        }
                    }
                    Err(e) => error!(error = %e, "control socket receive error"),
                }
            }

            _ = sweep_tick.tick() => {
                control_plane.sweep_registry(&config);
                run_dispatch_sweep(&mut control_socket, store.as_ref(), &dispatch_config, &control_plane.registry).await;
            }

            _ = sigterm.recv() => { info!("received SIGTERM, shutting down"); break; }
            _ = sigint.recv() => { info!("received SIGINT, shutting down"); break; }
            _ = sigquit.recv() => { info!("received SIGQUIT, shutting down"); break; }
            _ = sighup.recv() => {
                info!("received SIGHUP, reinitialising logging");
                // Leak the new guard: SIGHUP is rare and the alternative is
                // threading the guard back out through every select! arm.
                if let Ok(guard) = setup_logging(cli) {
                    std::mem::forget(guard);
                }
            }
        }

        if shutdown.load(Ordering::SeqCst) {
            break;
        }
    }
}

async fn run_dispatch_sweep(
    control_socket: &mut ControlSocket,
    store: &dyn Store,
    dispatch_config: &DispatchConfig,
    liveness: &dyn dispatcher_store::WorkerLiveness,
) {
    for outbox in Dispatcher::assign_submitted(store, liveness, dispatch_config).await {
        if let Err(e) = control_socket.send(&outbox.to, outbox.msg.encode()).await {
            error!(to = %outbox.to, error = %e, "failed to send START");
        }
    }
    for outbox in Dispatcher::propagate_cancellations(store).await {
        if let Err(e) = control_socket.send(&outbox.to, outbox.msg.encode()).await {
            error!(to = %outbox.to, error = %e, "failed to send CANCEL");
        }
    }
}

/// spec §5 "Log context": owns the log socket and `JobLogHandle` table,
/// polls non-blocking, sleeps `log_poll_idle` when idle, checks shutdown
/// each pass.
async fn run_log_context(mut log_socket: LogSocket, store: Arc<dyn Store>, shutdown: Arc<AtomicBool>) {
    let mut ingest = LogIngest::new(SystemClock);
    let config = MasterConfig::default();
    let mut reap_tick = tokio::time::interval(config.fd_timeout);
    let mut idle_tick = tokio::time::interval(config.log_poll_idle);

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        tokio::select! {
            frame = log_socket.recv() => {
                match frame {
                    Ok(frames) => match LogFrame::decode(&frames) {
                        Ok(log_frame) => ingest.process_frame(log_frame, store.as_ref()).await,
                        Err(e) => error!(error = %e, "malformed log frame"),
                    },
                    Err(e) => {
                        error!(error = %e, "log socket receive error");
                        tokio::time::sleep(config.log_poll_idle).await;
                    }
                }
            }
            _ = reap_tick.tick() => ingest.reap_idle(&config),
            // Rechecks the shutdown flag at log_poll_idle cadence even when
            // the socket is silent (spec §5's idle poll interval).
            _ = idle_tick.tick() => {}
        }
    }
}

fn validate_curve_config(cli: &Cli) -> Result<(), TransportError> {
    let cert = cli.master_cert.as_ref().ok_or_else(|| TransportError::Curve("--master-cert required with --encrypt".into()))?;
    if !cert.exists() {
        return Err(TransportError::Curve(format!("master cert {} not found", cert.display())));
    }
    let slaves = cli
        .slaves_certs
        .as_ref()
        .ok_or_else(|| TransportError::Curve("--slaves-certs required with --encrypt".into()))?;
    if !slaves.is_dir() {
        return Err(TransportError::Curve(format!("slaves-certs {} is not a directory", slaves.display())));
    }
    Ok(())
}

fn setup_logging(cli: &Cli) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*};

    if let Some(parent) = cli.log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_appender = tracing_appender::rolling::never(
        cli.log_file.parent().unwrap_or_else(|| std::path::Path::new(".")),
        cli.log_file.file_name().unwrap_or_else(|| std::ffi::OsStr::new("lava-master.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter: tracing_subscriber::filter::LevelFilter = cli.level.into();

    let _ = tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).try_init();

    Ok(guard)
}
