pub mod features;
pub mod i18n;
pub mod logging;
pub mod router;
pub mod state;
pub mod ui;
mod ui_tests;

rust_i18n::i18n!("locales", fallback = "en");

use jni::objects::{JClass, JString};
use jni::sys::{jlong, jstring};
use jni::JNIEnv;
use router::{error_ui, CoreService};
use std::path::PathBuf;
use std::ptr;

#[no_mangle]
pub extern "system" fn Java_com_joviansapps_ganymede_NativeBridge_create(
    mut env: JNIEnv,
    _class: JClass,
    data_dir: JString,
) -> jlong {
    logging::init_logging();
    let created = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let preferred: Option<PathBuf> = env
            .get_string(&data_dir)
            .ok()
            .map(|s| PathBuf::from(String::from(s)))
            .filter(|p| !p.as_os_str().is_empty());
        CoreService::new(preferred.as_deref())
    }));

    match created {
        Ok(Ok(service)) => Box::into_raw(Box::new(service)) as jlong,
        Ok(Err(err)) => {
            log::error!("core service failed to start: {err}");
            0
        }
        Err(_) => {
            log::error!("core service panicked during start");
            0
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_joviansapps_ganymede_NativeBridge_dispatch(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    input: JString,
) -> jstring {
    let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        // SAFETY: non-zero handles come from `create` and stay valid until `destroy`.
        let Some(service) = (unsafe { (handle as *const CoreService).as_ref() }) else {
            return error_ui("service_unavailable");
        };
        let input_str: String = env
            .get_string(&input)
            .map(|s| s.into())
            .unwrap_or_else(|_| "{}".to_string());
        service.dispatch_json(&input_str)
    }));

    let json_value = match response {
        Ok(value) => value,
        Err(_) => {
            log::error!("dispatch panicked");
            error_ui("panic")
        }
    };

    let output_string = json_value.to_string();
    match env.new_string(output_string) {
        Ok(java_str) => java_str.into_raw(),
        Err(_) => {
            let fallback = error_ui("jni_new_string_failed").to_string();
            env.new_string(fallback)
                .map(|s| s.into_raw())
                .unwrap_or(ptr::null_mut())
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_joviansapps_ganymede_NativeBridge_destroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle == 0 {
        return;
    }
    // SAFETY: the shell calls `destroy` once per handle returned by `create`.
    let service = unsafe { Box::from_raw(handle as *mut CoreService) };
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| drop(service))).is_err() {
        log::error!("core service panicked during shutdown");
    }
}
