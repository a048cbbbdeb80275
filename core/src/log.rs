use slog::{o, Discard, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, TermDecorator};

pub fn create_logger(for_module: &str) -> Logger {
    let decorator = TermDecorator::new().stderr().build();
    let drain = FullFormat::new(decorator)
        .use_utc_timestamp()
        .use_original_order()
        .build()
        .fuse();
    let async_drain = Async::new(drain).build().fuse();
    Logger::root(
        async_drain,
        o!("component" => "ecgcore", "module" => for_module.to_string()),
    )
}

/// Logger that drops every record. Handy for tests and library callers
/// that bring no logging of their own.
pub fn silent_logger() -> Logger {
    Logger::root(Discard, o!())
}
