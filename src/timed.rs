/// Run a closure, logging when it starts and how long it took to finish.
///
/// The closure comes first, followed by the `format!` arguments describing the step.
#[macro_export]
macro_rules! timed {
    ($closure:expr, $($arg:tt)+) => {{
        let msg = format!($($arg)+);

        let start_time = std::time::Instant::now();
        info!("Start: {}", msg);

        let out = $closure();

        info!("End:   {}: {:?}", msg, start_time.elapsed());

        out
    }};
}
