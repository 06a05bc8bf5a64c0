#![allow(dead_code)]

use futures::Stream;

/// First `count` Fibonacci numbers.
/// @bridge
pub fn fibonacci(count: usize) -> impl Iterator<Item = u64> {
    let mut state = (0u64, 1u64);
    (0..count).map(move |_| {
        let current = state.0;
        state = (state.1, state.0 + state.1);
        current
    })
}

/// @bridge
pub fn countdown(from: u32) -> impl Stream<Item = u32> {
    futures::stream::iter((0..=from).rev())
}

/// @bridge
pub async fn double(value: u64) -> u64 {
    value * 2
}

/// @bridge
pub async fn lookup(id: u32) -> Result<String, String> {
    if id == 0 {
        return Err("unknown id".to_string());
    }
    Ok(format!("user-{id}"))
}

/// @entrypoint
pub const SHOUT: fn(&str) -> String = |text| text.to_uppercase();
