//! Integration coverage for the configuration loader and the persistence
//! save/load/restore cycle, exercised through real files on disk rather
//! than in-memory structs only.

use lob_server::config::{Cli, ServerConfig};
use lob_server::orderbook::{Order, Side};
use lob_server::{persistence, ProductManager, UserRegistry};

fn write_config(dir: &std::path::Path, port: u16) -> std::path::PathBuf {
    let path = dir.join("lob-server.toml");
    std::fs::write(
        &path,
        format!(
            r#"
            products = ["ABC"]
            port = {port}
            trading_session = "127.0.0.1:0"
            quote_session = "127.0.0.1:0"
            initial_budget = 10000
            fixed_fee = 1
            percentage_fee = 0.001
            "#
        ),
    )
    .unwrap();
    path
}

fn cli_with(config: std::path::PathBuf, data_dir: std::path::PathBuf, port: Option<u16>) -> Cli {
    Cli { config, load: false, data_dir, port, trading_session: None, quote_session: None }
}

#[test]
fn s7_cli_port_override_wins_over_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), 7000);
    let cli = cli_with(config_path.clone(), dir.path().join("data"), Some(9000));

    let config = ServerConfig::load(&config_path, &cli).unwrap();
    assert_eq!(config.port, 9000);
}

#[test]
fn s9_corrupt_snapshot_falls_back_to_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("500-server_data.json"), "not valid json at all").unwrap();

    let path = persistence::newest_snapshot_file(dir.path()).unwrap();
    assert!(persistence::load(&path).is_err());
}

#[test]
fn save_restore_round_trip_preserves_resting_orders_and_users() {
    let dir = tempfile::tempdir().unwrap();
    let products = ProductManager::new(["ABC"]);
    let users = UserRegistry::new();
    let alice = users.register("alice", 5000);

    let book = products.book("ABC").unwrap();
    book.add(Order::new("41".into(), 1, alice.clone(), Side::Sell, 3, 150));
    products.capture_pre_state("ABC", 1);

    let path = persistence::save(dir.path(), &products, &users).unwrap();
    let state = persistence::load(&path).unwrap();
    let (restored_products, restored_users) = persistence::restore(state, &["ABC".to_string()]);

    assert!(restored_users.exists(&alice));
    assert_eq!(restored_users.budget_of(&alice), Some(5000));

    let restored_book = restored_products.book("ABC").unwrap();
    assert_eq!(restored_book.get("41").map(|o| o.quantity), Some(3));

    let last_snapshot = restored_products.history("ABC", Some(1));
    assert_eq!(last_snapshot.len(), 1);
    assert_eq!(last_snapshot[0].asks.len(), 1);
}
