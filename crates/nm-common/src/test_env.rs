use std::sync::Mutex;

static ENV_GUARD: Mutex<()> = Mutex::new(());

/// Run `f` with the given variables set (`Some`) or removed (`None`), restoring them afterwards.
pub(crate) fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
    let _guard = ENV_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let previous: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, value)| {
            let old = std::env::var(key).ok();
            match value {
                Some(v) => unsafe { std::env::set_var(key, v) },
                None => unsafe { std::env::remove_var(key) },
            }
            (key.to_string(), old)
        })
        .collect();

    f();

    for (key, old) in previous {
        match old {
            Some(v) => unsafe { std::env::set_var(&key, v) },
            None => unsafe { std::env::remove_var(&key) },
        }
    }
}
