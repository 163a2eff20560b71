use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the process logger. Safe to call from every JNI entry point.
pub fn init_logging() {
    INIT.call_once(install);
}

#[cfg(target_os = "android")]
fn install() {
    if log::set_logger(&LOGCAT).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[cfg(not(target_os = "android"))]
fn install() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(target_os = "android")]
static LOGCAT: Logcat = Logcat;

#[cfg(target_os = "android")]
struct Logcat;

#[cfg(target_os = "android")]
impl log::Log for Logcat {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        use android_log_sys::LogPriority;
        use std::ffi::CString;

        if !self.enabled(record.metadata()) {
            return;
        }
        let priority = match record.level() {
            log::Level::Error => LogPriority::ERROR,
            log::Level::Warn => LogPriority::WARN,
            log::Level::Info => LogPriority::INFO,
            log::Level::Debug => LogPriority::DEBUG,
            log::Level::Trace => LogPriority::VERBOSE,
        };
        let text = format!("{}: {}", record.target(), record.args());
        let Ok(message) = CString::new(text.replace('\0', " ")) else {
            return;
        };
        let tag = b"ganymede\0";
        unsafe {
            android_log_sys::__android_log_write(
                priority as _,
                tag.as_ptr() as *const _,
                message.as_ptr(),
            );
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_logging();
        init_logging();
        log::info!("logger ready");
    }
}
