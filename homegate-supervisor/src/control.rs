use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use crate::child::ChildState;

const CMD_UP: u8 = b'1';
const CMD_DOWN: u8 = b'2';
const CMD_STAT: u8 = b'3';

/// Implements the original `ps_socket_utils.py` wire protocol: a single ASCII digit
/// followed by `\0` in, `OK\0` or a status string followed by `\0` out.
pub struct ControlSocket {
    listener: UnixListener,
    path: String,
}

impl ControlSocket {
    pub fn bind(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(Self { listener, path: path.to_string() })
    }

    pub async fn serve(
        self,
        term_event: Arc<AtomicBool>,
        coap_state: Arc<tokio::sync::Mutex<ChildState>>,
        proxy_state: Arc<tokio::sync::Mutex<ChildState>>,
    ) -> anyhow::Result<()> {
        loop {
            if term_event.load(Ordering::SeqCst) {
                break;
            }
            let (stream, _) = tokio::select! {
                accepted = self.listener.accept() => accepted?,
                _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => continue,
            };
            let term_event = term_event.clone();
            let coap_state = coap_state.clone();
            let proxy_state = proxy_state.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, term_event, coap_state, proxy_state).await {
                    log::warn!("control socket connection error: {err}");
                }
            });
        }
        Ok(())
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    term_event: Arc<AtomicBool>,
    coap_state: Arc<tokio::sync::Mutex<ChildState>>,
    proxy_state: Arc<tokio::sync::Mutex<ChildState>>,
) -> anyhow::Result<()> {
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;
    if buf[1] != 0 {
        log::warn!("malformed control socket request: {:?}", buf);
        return Ok(());
    }

    let reply = match buf[0] {
        CMD_UP => {
            // The original's UP handler never assigned a reply, which crashed the
            // control loop downstream; a no-op success reply is the sane interpretation.
            "OK".to_string()
        }
        CMD_DOWN => {
            term_event.store(true, Ordering::SeqCst);
            "OK".to_string()
        }
        CMD_STAT => {
            let proxy = if proxy_state.lock().await.is_up() { "UP" } else { "DOWN" };
            let coap = if coap_state.lock().await.is_up() { "UP" } else { "DOWN" };
            format!("Proxy: {proxy}\nCoAP Server: {coap}")
        }
        other => {
            log::warn!("unknown control socket command: {other}");
            "ERR".to_string()
        }
    };

    stream.write_all(reply.as_bytes()).await?;
    stream.write_all(&[0u8]).await?;
    Ok(())
}
