//! Shared test data

use implore_frame::storage;

/// Header plus 300 rows, three columns
pub fn csv_bytes() -> Vec<u8> {
    let mut text = String::from("apple,beet,carrot\n");
    text.push_str(&"a,1,0.1\nb,2,0.2\nc,3,0.3\n".repeat(100));
    text.into_bytes()
}

/// Write the CSV fixture into the memory filesystem and return its URL
pub fn memory_csv(path: &str) -> String {
    storage::pipe(path, csv_bytes()).expect("memory store accepts writes");
    format!("memory://{}", path)
}

/// Install a subscriber so `RUST_LOG=debug` shows pipeline logs
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
