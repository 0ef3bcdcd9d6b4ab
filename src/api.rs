use std::convert::Infallible;
use std::future::Future;
use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Result;
use hyper::service::{make_service_fn, service_fn};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};

use crate::config::Listen;
use crate::controller::TaskController;
use crate::datastore::TaskDataStore;

pub struct Server<D>
where
    D: TaskDataStore,
{
    config: Listen,
    controller: Arc<TaskController<D>>,
}

impl<D> Server<D>
where
    D: TaskDataStore,
{
    pub fn new(config: Listen, controller: TaskController<D>) -> Server<D> {
        Server {
            config,
            controller: Arc::new(controller),
        }
    }

    /// Serves on `listener` until `shutdown` resolves, then drains in-flight requests
    /// for at most the configured grace period.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let controller = self.controller.clone();
        let make_svc = make_service_fn(move |_conn| {
            let controller = controller.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let controller = controller.clone();
                    async move { Ok::<_, Infallible>(controller.handle(req).await) }
                }))
            }
        });

        let (tx_shutdown, rx_shutdown) = watch::channel(false);
        tokio::spawn(async move {
            shutdown.await;
            let _ = tx_shutdown.send(true);
        });

        let server = hyper::Server::from_tcp(listener)?
            .http1_header_read_timeout(self.config.header_read_timeout)
            .serve(make_svc)
            .with_graceful_shutdown(triggered(rx_shutdown.clone()));
        info!("Server running on {}", addr);

        let grace = self.config.shutdown_grace;
        let deadline = async move {
            triggered(rx_shutdown).await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            res = server => {
                if let Err(err) = res {
                    error!(reason = %err, "Server terminated with error.");
                    anyhow::bail!("Server terminated with error: {}", err)
                }
            }
            _ = deadline => {
                warn!(grace = ?grace, "Grace period elapsed, dropping in-flight requests.");
            }
        }
        Ok(())
    }
}

async fn triggered(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Resolves on the first SIGINT or SIGTERM.
pub fn termination_signal() -> Result<impl Future<Output = ()>> {
    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                let _ = tx.send(signal);
            }
        })?;

    Ok(async move {
        match rx.await {
            Ok(signal) => info!(signal, "Termination signal received."),
            Err(_) => warn!("Signal listener stopped."),
        }
    })
}
