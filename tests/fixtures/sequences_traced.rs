#![allow(dead_code)]

use futures::Stream;

/// First `count` Fibonacci numbers.
/// @bridge
pub fn fibonacci(count: usize) -> impl Iterator<Item = u64> {
    fn __bridgetape_inner(count: usize) -> impl Iterator<Item = u64> {
        let mut state = (0u64, 1u64);
        (0..count).map(move |_| {
            let current = state.0;
            state = (state.1, state.0 + state.1);
            current
        })
    }
    ::bridgetape::runtime::trace_iter(
        "fibonacci",
        "tests/fixtures/sequences.rs",
        ::std::vec![::bridgetape::runtime::capture(&count)],
        move || __bridgetape_inner(count)
    )
}

/// @bridge
pub fn countdown(from: u32) -> impl Stream<Item = u32> {
    fn __bridgetape_inner(from: u32) -> impl Stream<Item = u32> {
        futures::stream::iter((0..=from).rev())
    }
    ::bridgetape::runtime::trace_stream(
        "countdown",
        "tests/fixtures/sequences.rs",
        ::std::vec![::bridgetape::runtime::capture(&from)],
        move || __bridgetape_inner(from)
    )
}

/// @bridge
pub async fn double(value: u64) -> u64 {
    async fn __bridgetape_inner(value: u64) -> u64 {
        value * 2
    }
    ::bridgetape::runtime::trace_async(
        "double",
        "tests/fixtures/sequences.rs",
        ::std::vec![::bridgetape::runtime::capture(&value)],
        async move { ::bridgetape::runtime::Returned(__bridgetape_inner(value).await) },
    )
    .await
    .0
}

/// @bridge
pub async fn lookup(id: u32) -> Result<String, String> {
    async fn __bridgetape_inner(id: u32) -> Result<String, String> {
        if id == 0 {
            return Err("unknown id".to_string());
        }
        Ok(format!("user-{id}"))
    }
    ::bridgetape::runtime::trace_async(
        "lookup",
        "tests/fixtures/sequences.rs",
        ::std::vec![::bridgetape::runtime::capture(&id)],
        __bridgetape_inner(id)
    )
    .await
}

/// @entrypoint
pub const SHOUT: fn(&str) -> String = |text| {
    fn __bridgetape_inner(text: &str) -> String {
        text.to_uppercase()
    }
    ::bridgetape::runtime::trace_sync(
        "SHOUT",
        "tests/fixtures/sequences.rs",
        ::std::vec![::bridgetape::runtime::capture(&text)],
        move || ::bridgetape::runtime::Returned(__bridgetape_inner(text)),
    )
    .0
};
