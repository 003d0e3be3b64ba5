//! Trading server binary: two TCP sessions (trading, quote), a shared
//! dispatcher, and graceful shutdown with state persistence.

use clap::Parser;
use lob_server::config::{Cli, ServerConfig};
use lob_server::orderbook::FeeSchedule;
use lob_server::{current_time_micros, dispatch, persistence, Codec, Message, ProductManager, ServerState, SnapshotBroadcaster, UserRegistry};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::level_filters::LevelFilter;

/// Whether a session accepts state-mutating requests or only reads, per §6.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SessionKind {
    Trading,
    Quote,
}

struct App {
    state: Mutex<ServerState>,
    broadcaster: SnapshotBroadcaster,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(LevelFilter::INFO).init();

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli.config, &cli)?;

    let (products, users) = if cli.load {
        load_persisted(&cli.data_dir, &config)
    } else {
        (ProductManager::new(config.products.clone()), UserRegistry::new())
    };

    let fees = FeeSchedule::new(config.fixed_fee, config.percentage_fee);
    let app = Arc::new(App {
        state: Mutex::new(ServerState::new(products, users, fees)),
        broadcaster: SnapshotBroadcaster::new(),
    });

    let trading_listener = TcpListener::bind(&config.trading_session).await?;
    let quote_listener = TcpListener::bind(&config.quote_session).await?;
    tracing::info!(trading = %config.trading_session, quote = %config.quote_session, "listening");

    let trading_app = app.clone();
    let trading_task = tokio::spawn(accept_loop(trading_listener, trading_app, SessionKind::Trading));
    let quote_app = app.clone();
    let quote_task = tokio::spawn(accept_loop(quote_listener, quote_app, SessionKind::Quote));

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, persisting state");

    trading_task.abort();
    quote_task.abort();

    let state = app.state.lock().await;
    match persistence::save(&cli.data_dir, &state.products, &state.users) {
        Ok(path) => tracing::info!(path = %path.display(), "persisted server state"),
        Err(err) => tracing::error!(%err, "failed to persist server state"),
    }

    Ok(())
}

fn load_persisted(data_dir: &std::path::Path, config: &ServerConfig) -> (ProductManager, UserRegistry) {
    let Some(path) = persistence::newest_snapshot_file(data_dir) else {
        tracing::warn!(dir = %data_dir.display(), "no persisted snapshot found, starting empty");
        return (ProductManager::new(config.products.clone()), UserRegistry::new());
    };
    match persistence::load(&path) {
        Ok(persisted) => {
            tracing::info!(path = %path.display(), "restored server state");
            persistence::restore(persisted, &config.products)
        }
        Err(err) => {
            tracing::warn!(%err, path = %path.display(), "persisted snapshot corrupt, starting empty");
            (ProductManager::new(config.products.clone()), UserRegistry::new())
        }
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        let mut sigquit = signal(SignalKind::quit()).expect("failed to register SIGQUIT handler");
        tokio::select! {
            _ = sigint.recv() => {},
            _ = sigterm.recv() => {},
            _ = sigquit.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn accept_loop(listener: TcpListener, app: Arc<App>, kind: SessionKind) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tracing::debug!(%addr, "connection accepted");
                let app = app.clone();
                tokio::spawn(handle_connection(stream, app, kind));
            }
            Err(err) => {
                tracing::error!(%err, "failed to accept connection");
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, app: Arc<App>, kind: SessionKind) {
    let mut codec = Codec::new("SERVER", "CLIENT");
    let mut buf = vec![0u8; 4096];
    let mut subscription = app.broadcaster.subscribe();

    loop {
        tokio::select! {
            read = stream.read(&mut buf) => {
                match read {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Some(decoded) = codec.push(&buf[..n]) {
                            match decoded {
                                Ok(decoded) => {
                                    if let Err(err) = route(&mut stream, &mut codec, &app, kind, decoded.header.sender, decoded.body).await {
                                        tracing::warn!(%err, "failed to write response");
                                        break;
                                    }
                                }
                                Err(err) => {
                                    tracing::warn!(%err, "failed to decode message");
                                }
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, "connection read error");
                        break;
                    }
                }
            }
            snapshot = subscription.receiver.recv() => {
                match snapshot {
                    Some(bytes) => {
                        if stream.write_all(&bytes).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    app.broadcaster.unsubscribe(subscription.id);
}

async fn route(
    stream: &mut TcpStream,
    codec: &mut Codec,
    app: &App,
    kind: SessionKind,
    sender: String,
    message: Message,
) -> std::io::Result<()> {
    if kind == SessionKind::Quote && is_mutating(&message) {
        let encoded = codec.encode(
            &Message::Reject {
                order_id: String::new(),
                reason: "mutating request on quote session".to_string(),
            },
            current_time_micros(),
        );
        return stream.write_all(&encoded).await;
    }

    let dispatched = {
        let state = app.state.lock().await;
        dispatch(&state, &sender, message)
    };

    let encoded = codec.encode(&dispatched.response, current_time_micros());
    stream.write_all(&encoded).await?;

    if let Some(product) = dispatched.broadcast_product {
        let state = app.state.lock().await;
        if let Some(book) = state.products.book(&product) {
            let snapshot = Message::MarketDataSnapshot { product, order_book: book.snapshot() };
            app.broadcaster.broadcast(codec.encode(&snapshot, current_time_micros()));
        }
    }

    Ok(())
}

fn is_mutating(message: &Message) -> bool {
    matches!(
        message,
        Message::RegisterRequest { .. }
            | Message::NewOrderSingle { .. }
            | Message::OrderCancelRequest { .. }
            | Message::OrderModifyRequestQty { .. }
    )
}
