use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message};

use super::types::LiveFrame;

// ---------------------------------------------------------------------------
// Live orientation feed
// ---------------------------------------------------------------------------
//
// The sensor backend pushes rolling-window frames over a websocket. A
// dedicated thread owns the socket and forwards decoded frames to the UI
// over an mpsc channel; the UI drains the channel once per repaint.

/// Events the feed thread emits towards the UI.
#[derive(Debug)]
pub enum LiveEvent {
    Connected,
    Frame(LiveFrame),
    Disconnected(Option<String>),
}

/// Handle to the feed thread. Dropping it (or calling [`LiveFeed::stop`])
/// asks the thread to shut down; the thread notices within one read timeout.
pub struct LiveFeed {
    stop: Arc<AtomicBool>,
}

impl LiveFeed {
    /// Connect to the backend's live endpoint and start forwarding frames.
    ///
    /// `repaint` is invoked after every delivered event so the UI wakes up
    /// even when the user is not interacting.
    pub fn connect(
        base_url: &str,
        tx: Sender<LiveEvent>,
        repaint: impl Fn() + Send + 'static,
    ) -> LiveFeed {
        let stop = Arc::new(AtomicBool::new(false));
        let url = websocket_url(base_url);
        let stop_flag = Arc::clone(&stop);

        std::thread::Builder::new()
            .name("live-feed".to_string())
            .spawn(move || run_feed(&url, &tx, &stop_flag, repaint))
            .ok();

        LiveFeed { stop }
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `https://host` → `wss://host/ws/datos_vivo` (and `http` → `ws`).
fn websocket_url(base_url: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    format!("{}/ws/datos_vivo", ws_base.trim_end_matches('/'))
}

fn run_feed(
    url: &str,
    tx: &Sender<LiveEvent>,
    stop: &AtomicBool,
    repaint: impl Fn(),
) {
    let (mut socket, _response) = match connect(url) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("live feed connect failed: {e}");
            let _ = tx.send(LiveEvent::Disconnected(Some(e.to_string())));
            repaint();
            return;
        }
    };

    // Short read timeout so the stop flag is honoured between frames.
    let timeout = Some(Duration::from_millis(500));
    match socket.get_ref() {
        MaybeTlsStream::Plain(s) => {
            let _ = s.set_read_timeout(timeout);
        }
        MaybeTlsStream::NativeTls(s) => {
            let _ = s.get_ref().set_read_timeout(timeout);
        }
        _ => {}
    }

    log::info!("live feed connected: {url}");
    let _ = tx.send(LiveEvent::Connected);
    repaint();

    loop {
        if stop.load(Ordering::Relaxed) {
            let _ = socket.close(None);
            let _ = tx.send(LiveEvent::Disconnected(None));
            repaint();
            return;
        }

        match socket.read() {
            Ok(Message::Text(text)) => match serde_json::from_str::<LiveFrame>(&text) {
                Ok(frame) if !frame.labels.is_empty() => {
                    if tx.send(LiveEvent::Frame(frame)).is_err() {
                        return; // UI side is gone
                    }
                    repaint();
                }
                Ok(_) => {}
                Err(e) => log::warn!("live feed: undecodable frame: {e}"),
            },
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => {}
            Ok(Message::Close(_)) | Ok(Message::Frame(_)) => {
                let _ = tx.send(LiveEvent::Disconnected(None));
                repaint();
                return;
            }
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Read timeout; loop back to check the stop flag.
            }
            Err(e) => {
                log::error!("live feed dropped: {e}");
                let _ = tx.send(LiveEvent::Disconnected(Some(e.to_string())));
                repaint();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_rewrites_scheme() {
        assert_eq!(
            websocket_url("https://motiometrics-backend.onrender.com"),
            "wss://motiometrics-backend.onrender.com/ws/datos_vivo"
        );
        assert_eq!(
            websocket_url("http://127.0.0.1:5000/"),
            "ws://127.0.0.1:5000/ws/datos_vivo"
        );
    }
}
