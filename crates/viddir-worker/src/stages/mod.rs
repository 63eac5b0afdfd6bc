//! Job handlers, one per pipeline stage.

mod edit;
mod filter;
mod normalize;
mod publish;
mod transcribe;

pub use edit::EditHandler;
pub use filter::FilterHandler;
pub use normalize::NormalizeHandler;
pub use publish::PublishHandler;
pub use transcribe::TranscribeHandler;

/// File name without its extension.
pub(crate) fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

/// `<stem>_<suffix>.mp4` next to `file_name`.
pub(crate) fn derived_name(file_name: &str, suffix: &str) -> String {
    format!("{}_{}.mp4", file_stem(file_name), suffix)
}

/// Output name for one publish rung: `<base>_ladder_<label>.mp4`, where the
/// base is the stem up to its first `_`.
pub(crate) fn ladder_name(working_file: &str, label: &str) -> String {
    let stem = file_stem(working_file);
    let base = stem.split('_').next().unwrap_or(stem);
    format!("{}_ladder_{}.mp4", base, label)
}

/// Scratch audio name used for extraction: `<stem>.mp3`.
pub(crate) fn audio_name(working_file: &str) -> String {
    format!("{}.mp3", file_stem(working_file))
}
