use crate::application::state::AppState;
use crate::domain::keys::{SETTINGS_INBOX_LIMIT, SETTINGS_SOUND_ENABLED};
use crate::domain::models::clamp_inbox_limit;
use crate::infrastructure::error::InfraError;

/// Stores the clamped limit and returns it. Items already above a lowered
/// limit stay; only new insertions are refused.
pub fn update_inbox_limit(state: &AppState, value: i64) -> Result<u32, InfraError> {
    let limit = clamp_inbox_limit(value);
    let mut runtime = state.lock_runtime()?;
    runtime.inbox_limit = limit;
    state.write_json(SETTINGS_INBOX_LIMIT, &limit);
    drop(runtime);

    state.log_info("update_inbox_limit", &format!("requested={value} limit={limit}"));
    Ok(limit)
}

pub fn toggle_sound(state: &AppState) -> Result<bool, InfraError> {
    let mut runtime = state.lock_runtime()?;
    runtime.sound_enabled = !runtime.sound_enabled;
    let enabled = runtime.sound_enabled;
    state.write_json(SETTINGS_SOUND_ENABLED, &enabled);
    drop(runtime);

    state.log_info("toggle_sound", &format!("enabled={enabled}"));
    Ok(enabled)
}

/// Removes every key in the namespace, then reloads defaults. Keys outside
/// the namespace are untouched.
pub fn factory_reset(state: &AppState) -> Result<usize, InfraError> {
    let keys = state.stored_keys();
    for key in &keys {
        state.remove_key(key);
    }
    state.reload()?;

    state.log_info("factory_reset", &format!("removed keys={}", keys.len()));
    Ok(keys.len())
}
