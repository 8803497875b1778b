pub mod rest;

use std::path::Path;

use anyhow::{Result, anyhow};
use biblio_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, info};

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "biblio-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Config with its own data directory and a schema ready database,
/// so tests can seed records before the server starts.
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    let (args, guard) = test_config(test_name, &base_dir)?;
    let pool = biblio_dal::new_pool(&args.database_url()).await?;
    biblio_dal::migrate(&pool).await?;
    pool.close().await;
    Ok((args, guard))
}

pub struct ServerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<biblio_server::Result<()>>,
}

impl ServerHandle {
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        (&mut self.task).await??;
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Starts the server in background and waits until it answers health checks.
pub async fn spawn_server(args: ServerConfig) -> Result<ServerHandle> {
    let health_url = args.base_url.join("health")?;
    let state = biblio_server::build_state(&args).await?;
    let (sender, receiver) = oneshot::channel::<()>();
    let shutdown = async move {
        let _ = receiver.await;
    };
    let task = tokio::spawn(biblio_server::run_graceful_with_state(args, state, shutdown));

    let client = reqwest::Client::new();
    for attempt in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Server ready after {attempt} attempts");
                return Ok(ServerHandle {
                    shutdown: Some(sender),
                    task,
                });
            }
            other => debug!("Server not ready yet: {other:?}"),
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    Err(anyhow!("Server did not start"))
}

pub fn extend_url(url: &Url, segment: impl ToString) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("base url")
        .pop_if_empty()
        .push(&segment.to_string());
    url
}
