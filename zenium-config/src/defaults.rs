//! Default value functions for configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes on
//! `ShellConfig` fields.

// ── Layout ─────────────────────────────────────────────────────────────────

pub fn sidebar_width() -> f64 {
    200.0
}

pub fn view_padding() -> f64 {
    10.0
}

pub fn resize_handle_width() -> f64 {
    10.0
}

pub fn titlebar_collapsed_y() -> f64 {
    10.0
}

pub fn titlebar_expanded_y() -> f64 {
    40.0
}

pub fn titlebar_trigger_height() -> f64 {
    10.0
}

pub fn loading_bar_height() -> f64 {
    5.0
}

// ── Timing ─────────────────────────────────────────────────────────────────

pub fn animation_duration_ms() -> u64 {
    150
}

pub fn animation_frame_ms() -> u64 {
    16
}

pub fn loading_hide_delay_ms() -> u64 {
    600
}

pub fn ui_request_timeout_ms() -> u64 {
    2000
}

pub fn restore_ack_timeout_ms() -> u64 {
    2000
}

pub fn shutdown_hard_timeout_ms() -> u64 {
    5000
}

pub fn titlebar_poll_ms() -> u64 {
    250
}

// ── Navigation ─────────────────────────────────────────────────────────────

pub fn new_tab_url() -> String {
    "zenium://newtab".to_string()
}

pub fn search_url() -> String {
    "https://www.google.com/search?hl=en&gl=us&q=".to_string()
}

// ── Settings store ─────────────────────────────────────────────────────────

pub fn settings_theme() -> &'static str {
    "system"
}

pub fn settings_new_tab_url() -> &'static str {
    "https://www.google.com"
}
