//! Ephemeral HTTP file server harness
//!
//! `start` binds on the caller's thread (so a busy port fails right there), then hands the
//! listener to an actix system running on a dedicated thread. That thread fires a one-shot
//! [`ReadinessSignal`] once the server is constructed; `await_ready` blocks on it with a bound.
//! `stop` sends the stop command and waits, also bounded, for the thread to exit. Dropping a
//! [`ServerHandle`] that was never stopped performs the same shutdown.
//!
//! ```no_run
//! use std::time::Duration;
//! use webtree_harness::server;
//!
//! let handle = server::start("./web_root", "127.0.0.1", 0)?;
//! server::await_ready(&handle, Duration::from_secs(5))?;
//! println!("{}", handle.url("/index.html"));
//! server::stop(handle)?;
//! # Ok::<(), webtree_harness::HarnessError>(())
//! ```

use std::net::{ IpAddr, SocketAddr, TcpListener };
use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::mpsc::{ self, RecvTimeoutError };
use std::sync::{ Arc, Condvar, Mutex, PoisonError };
use std::thread::{ self, JoinHandle };
use std::time::Duration;

use actix_web::dev::ServerHandle as ControlHandle;
use actix_web::http::{ KeepAlive, header };
use actix_web::{ App, HttpServer, middleware, web };
use log::{ debug, error, info, warn };

use crate::cofg::Cofg;
use crate::error::{ HarnessError, HarnessResult };
use crate::mapper::{ PathMapper, WebtreeMapper };
use crate::request::{ self, SERVER_HEADER, WebtreeState };

const DEFAULT_LOGGER_FORMAT: &str = r#"%{url}xi %s "%{Referer}i" "%{User-Agent}i""#;

/// How a server instance is run. Built from [`Cofg`]; `Default` uses the built-in config.
#[derive(Clone)]
pub struct ServerOptions {
    pub workers: usize,
    pub keep_alive: bool,
    pub shutdown_timeout: Duration,
    /// Extra time allowed for the serve thread to exit after `shutdown_timeout`.
    pub join_grace: Duration,
    pub show_files_listing: bool,
    /// `None` disables request logging.
    pub logger_format: Option<String>,
    pub mapper: Arc<dyn PathMapper>,
}

impl ServerOptions {
    pub fn with_mapper(mut self, mapper: impl PathMapper) -> Self {
        self.mapper = Arc::new(mapper);
        self
    }
}

impl From<&Cofg> for ServerOptions {
    fn from(c: &Cofg) -> Self {
        Self {
            workers: c.server.workers.max(1),
            keep_alive: c.server.keep_alive,
            shutdown_timeout: c.shutdown_timeout(),
            join_grace: c.join_grace(),
            show_files_listing: c.server.show_files_listing,
            logger_format: c.middleware.logger.enabling.then(|| c.middleware.logger.format.clone()),
            mapper: Arc::new(WebtreeMapper),
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from(&Cofg::default())
    }
}

enum Readiness<T> {
    Pending,
    Ready(T),
    Failed(String),
}

/// One-shot latch set by the server's startup path, either with a value (ready) or a failure
/// reason. Only the first `fire`/`fail` counts.
pub struct ReadinessSignal<T = ControlHandle> {
    state: Mutex<Readiness<T>>,
    cond: Condvar,
}

impl<T: Clone> Default for ReadinessSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ReadinessSignal<T> {
    pub fn new() -> Self {
        Self { state: Mutex::new(Readiness::Pending), cond: Condvar::new() }
    }

    fn settle(&self, outcome: Readiness<T>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*state, Readiness::Pending) {
            warn!("readiness signal already set; ignoring");
            return;
        }
        *state = outcome;
        self.cond.notify_all();
    }

    pub fn fire(&self, value: T) {
        self.settle(Readiness::Ready(value));
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.settle(Readiness::Failed(reason.into()));
    }

    pub fn is_set(&self) -> bool {
        !matches!(*self.state.lock().unwrap_or_else(PoisonError::into_inner), Readiness::Pending)
    }

    /// Block until the latch is set or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> HarnessResult<T> {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self.cond
            .wait_timeout_while(guard, timeout, |s| matches!(s, Readiness::Pending))
            .unwrap_or_else(PoisonError::into_inner);
        match &*guard {
            Readiness::Ready(value) => Ok(value.clone()),
            Readiness::Failed(reason) => Err(HarnessError::Startup(reason.clone())),
            Readiness::Pending => Err(HarnessError::timeout("server readiness", timeout)),
        }
    }
}

/// Runs when the serve thread ends, normally or by panic.
struct ExitGuard {
    running: Arc<AtomicBool>,
    ready: Arc<ReadinessSignal>,
    _exited: mpsc::Sender<()>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if !self.ready.is_set() {
            self.ready.fail("server thread exited before signalling readiness");
        }
    }
}

/// A running server. Owned by the test that started it; stopped by [`ServerHandle::stop`] or
/// on drop.
pub struct ServerHandle {
    host: String,
    addr: SocketAddr,
    root: PathBuf,
    running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    ready: Arc<ReadinessSignal>,
    thread: Option<JoinHandle<std::io::Result<()>>>,
    exited: mpsc::Receiver<()>,
    stop_bound: Duration,
}

fn request_logger(format: &str) -> middleware::Logger {
    middleware::Logger::new(format).custom_request_replace("url", |req| {
        let u = &req.uri().to_string();
        percent_encoding
            ::percent_decode(u.as_bytes())
            .decode_utf8()
            .unwrap_or(std::borrow::Cow::Borrowed(u))
            .to_string()
    })
}

async fn serve(
    listener: TcpListener,
    state: web::Data<WebtreeState>,
    options: ServerOptions,
    ready: Arc<ReadinessSignal>,
    stop_requested: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let logger_format = options.logger_format.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                middleware::Condition::new(
                    logger_format.is_some(),
                    request_logger(logger_format.as_deref().unwrap_or(DEFAULT_LOGGER_FORMAT))
                )
            )
            .wrap(middleware::DefaultHeaders::new().add((header::SERVER, SERVER_HEADER)))
            .default_service(web::to(request::serve_webtree))
    })
        .workers(options.workers.max(1))
        .keep_alive(if options.keep_alive { KeepAlive::Os } else { KeepAlive::Disabled })
        .shutdown_timeout(options.shutdown_timeout.as_secs())
        .disable_signals()
        .listen(listener);

    let server = match server {
        Ok(s) => s.run(),
        Err(e) => {
            ready.fail(e.to_string());
            return Err(e);
        }
    };
    let control = server.handle();
    ready.fire(control.clone());
    // a stop that gave up waiting for readiness is honored here
    if stop_requested.load(Ordering::SeqCst) {
        debug!("stop requested before readiness; stopping");
        drop(control.stop(true));
    }
    server.await
}

/// Start serving `root` on `host:port` with the built-in options. Port 0 picks a free port.
pub fn start(root: impl Into<PathBuf>, host: &str, port: u16) -> HarnessResult<ServerHandle> {
    start_with(root, host, port, ServerOptions::default())
}

/// Start serving `root` on `host:port`.
///
/// The socket is bound before this returns; requests must still wait for [`await_ready`].
pub fn start_with(
    root: impl Into<PathBuf>,
    host: &str,
    port: u16,
    options: ServerOptions,
) -> HarnessResult<ServerHandle> {
    let root = root.into();
    let bind_err = |source| HarnessError::Bind { addr: format!("{host}:{port}"), source };
    let listener = TcpListener::bind((host, port)).map_err(bind_err)?;
    let addr = listener.local_addr().map_err(bind_err)?;
    info!("serving {} on http://{addr}/", root.display());

    let running = Arc::new(AtomicBool::new(true));
    let stop_requested = Arc::new(AtomicBool::new(false));
    let ready = Arc::new(ReadinessSignal::new());
    let (exited_tx, exited) = mpsc::channel::<()>();
    let stop_bound = options.shutdown_timeout + options.join_grace;
    let state = web::Data::new(
        WebtreeState::new(root.clone(), Arc::clone(&options.mapper), options.show_files_listing)
    );

    let guard = ExitGuard {
        running: Arc::clone(&running),
        ready: Arc::clone(&ready),
        _exited: exited_tx,
    };
    let thread_ready = Arc::clone(&ready);
    let thread_stop = Arc::clone(&stop_requested);
    let thread = thread::Builder
        ::new()
        .name(format!("webtree-server-{}", addr.port()))
        .spawn(move || {
            let _guard = guard;
            let result = actix_web::rt::System
                ::new()
                .block_on(serve(listener, state, options, thread_ready, thread_stop));
            if let Err(e) = &result {
                error!("server error: {e:?}");
            }
            result
        })?;

    Ok(ServerHandle {
        host: host.to_string(),
        addr,
        root,
        running,
        stop_requested,
        ready,
        thread: Some(thread),
        exited,
        stop_bound,
    })
}

/// Block until `handle`'s server signals readiness or `timeout` elapses.
pub fn await_ready(handle: &ServerHandle, timeout: Duration) -> HarnessResult<()> {
    handle.await_ready(timeout)
}

/// Stop `handle`'s server and wait for its thread to exit.
pub fn stop(handle: ServerHandle) -> HarnessResult<()> {
    handle.stop()
}

impl ServerHandle {
    /// Actual bound address (resolves port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// `http://host:port` using the requested host name, like clients are told to.
    pub fn base_url(&self) -> String {
        if self.host.parse::<IpAddr>().is_ok() {
            format!("http://{}", self.addr)
        } else {
            format!("http://{}:{}", self.host, self.addr.port())
        }
    }

    /// Full URL for `path` (which should start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    pub fn await_ready(&self, timeout: Duration) -> HarnessResult<()> {
        self.ready.wait(timeout).map(|_| ())
    }

    pub fn stop(mut self) -> HarnessResult<()> {
        self.shutdown()
    }

    /// Block until the serve thread exits on its own, without asking it to stop.
    pub fn wait(mut self) -> HarnessResult<()> {
        match self.thread.take() {
            Some(thread) => Self::join(thread),
            None => Ok(()),
        }
    }

    fn join(thread: JoinHandle<std::io::Result<()>>) -> HarnessResult<()> {
        match thread.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                // already reported through the readiness signal or logged by the thread
                debug!("serve thread ended with {e}");
                Ok(())
            }
            Err(_) => Err(HarnessError::Other("server thread panicked".to_string())),
        }
    }

    /// Stop the server and join its thread. On a timeout the join handle is kept, so a later
    /// call (e.g. from `Drop`) tries again.
    fn shutdown(&mut self) -> HarnessResult<()> {
        if self.thread.is_none() {
            return Ok(());
        }
        self.stop_requested.store(true, Ordering::SeqCst);

        match self.ready.wait(self.stop_bound) {
            Ok(control) => {
                info!("stopping server on {}", self.addr);
                // the command is queued here; completion is observed through the thread exit
                drop(control.stop(true));
            }
            Err(HarnessError::Startup(reason)) => debug!("server never started: {reason}"),
            Err(e) => return Err(e),
        }

        match self.exited.recv_timeout(self.stop_bound) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                return Err(HarnessError::timeout("server shutdown", self.stop_bound));
            }
        }
        match self.thread.take() {
            Some(thread) => Self::join(thread),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("failed to stop server on {}: {e}", self.addr);
        }
    }
}
