/// Returns the last path segment of a `module_path!()` string, used as the
/// component tag of every log line.
pub fn component(module_path: &'static str) -> &'static str {
    module_path.rsplit("::").next().unwrap_or(module_path)
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        println!(
            "\x1b[32m[INFO] [{}]\x1b[0m [{}] {}",
            chrono::Utc::now().format("%H:%M:%S"),
            $crate::logger::component(module_path!()),
            format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        println!(
            "\x1b[33m[LOG]  [{}]\x1b[0m [{}] {}",
            chrono::Utc::now().format("%H:%M:%S"),
            $crate::logger::component(module_path!()),
            format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        println!(
            "\x1b[35m[WARN] [{}]\x1b[0m [{}] {}",
            chrono::Utc::now().format("%H:%M:%S"),
            $crate::logger::component(module_path!()),
            format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        println!(
            "\x1b[31m[ERROR][{}]\x1b[0m [{}] {}",
            chrono::Utc::now().format("%H:%M:%S"),
            $crate::logger::component(module_path!()),
            format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {
        panic!(
            "\x1b[1;31m[FATAL][{}]\x1b[0m [{}] {}",
            chrono::Utc::now().format("%H:%M:%S"),
            $crate::logger::component(module_path!()),
            format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! event {
    ($($arg:tt)*) => {
        if std::env::var("LOG_AUTOPILOT_EVENTS").is_ok() {
            println!(
                "\x1b[36m[EVENT][{}]\x1b[0m [{}] {}",
                chrono::Utc::now().format("%H:%M:%S"),
                $crate::logger::component(module_path!()),
                format!($($arg)*)
            )
        }
    };
}
